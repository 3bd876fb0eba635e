//! The conversation script, resolved against the asset catalog.

use std::time::Duration;

use {
    courier_common::{Asset, DeliveryRequest, FollowupPayload, Markup, RecipientId},
    courier_config::CourierConfig,
    courier_engine::FollowupTask,
};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Step {
    pub asset: Asset,
    pub caption: Option<String>,
    pub markup: Option<Markup>,
}

#[derive(Debug, Clone)]
pub struct Reveal {
    pub callback: String,
    pub text: String,
    pub markup: Option<Markup>,
}

#[derive(Debug, Clone)]
pub struct Followup {
    pub delay: Duration,
    pub payload: FollowupPayload,
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub steps: Vec<Step>,
    pub reveal: Option<Reveal>,
    pub followup: Option<Followup>,
}

impl Script {
    /// Resolve step asset keys against the catalog. Fails on the first step
    /// naming an undeclared asset.
    pub fn compile(config: &CourierConfig) -> Result<Self> {
        let catalog = config.asset_catalog();
        let script = &config.script;

        let steps = script
            .start_steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let asset = catalog
                    .get(&step.asset)
                    .cloned()
                    .ok_or_else(|| Error::unknown_asset(i, &step.asset))?;
                Ok(Step {
                    asset,
                    caption: step.caption.clone(),
                    markup: step.button.clone().map(Markup::single),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let reveal = script.reveal.as_ref().map(|r| Reveal {
            callback: r.callback.clone(),
            text: r.text.clone(),
            markup: Some(Markup::column(r.links.iter().cloned())).filter(|m| !m.is_empty()),
        });

        let followup = script.followup.as_ref().map(|f| {
            let mut payload = FollowupPayload::new(f.text.clone());
            if let Some(ref button) = f.button {
                payload = payload.with_markup(Markup::single(button.clone()));
            }
            Followup {
                delay: Duration::from_secs(f.delay_secs),
                payload,
            }
        });

        Ok(Self {
            steps,
            reveal,
            followup,
        })
    }

    /// Delivery requests for the `/start` sequence, in order.
    pub fn start_requests(&self, to: RecipientId) -> Vec<DeliveryRequest> {
        self.steps
            .iter()
            .map(|step| {
                let mut request = DeliveryRequest::new(to, step.asset.clone());
                if let Some(ref caption) = step.caption {
                    request = request.with_caption(caption.clone());
                }
                if let Some(ref markup) = step.markup {
                    request = request.with_markup(markup.clone());
                }
                request
            })
            .collect()
    }

    pub fn followup_task(&self, to: RecipientId) -> Option<FollowupTask> {
        self.followup.as_ref().map(|f| FollowupTask {
            recipient: to,
            fire_after: f.delay,
            payload: f.payload.clone(),
        })
    }

    /// The reveal triggered by `data`, if any.
    pub fn reveal_for(&self, data: &str) -> Option<&Reveal> {
        self.reveal.as_ref().filter(|r| r.callback == data)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, courier_common::AssetKind};

    const CONFIG: &str = r#"
        [assets.audio]
        kind = "audio"
        local_path = "/srv/courier/voice.ogg"

        [assets.gift]
        kind = "image"
        remote_url = "https://cdn.example.com/gift.jpg"

        [script]
        start_steps = [
            { asset = "audio" },
            { asset = "gift", caption = "Your gift is here", button = { label = "Open my box", callback = "open_box" } },
        ]
        reveal = { callback = "open_box", text = "Unlocked!", links = [
            { label = "Create account", url = "https://example.com/signup" },
            { label = "Join the community", url = "https://t.me/+invite" },
        ] }
        followup = { delay_secs = 300, text = "Still there?", button = { label = "Open my box", callback = "open_box" } }
    "#;

    fn script() -> Script {
        let config: CourierConfig = toml::from_str(CONFIG).unwrap();
        Script::compile(&config).unwrap()
    }

    #[test]
    fn start_sequence_keeps_order_and_decoration() {
        let requests = script().start_requests(RecipientId(42));
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].asset.kind(), AssetKind::Audio);
        assert!(requests[0].caption.is_none());
        assert!(requests[0].markup.is_none());

        assert_eq!(requests[1].asset.key(), "gift");
        assert_eq!(requests[1].caption.as_deref(), Some("Your gift is here"));
        let markup = requests[1].markup.as_ref().unwrap();
        assert_eq!(markup.rows[0][0].label, "Open my box");
        assert!(requests.iter().all(|r| r.recipient == RecipientId(42)));
    }

    #[test]
    fn reveal_links_are_one_per_row() {
        let script = script();
        let reveal = script.reveal_for("open_box").unwrap();
        assert_eq!(reveal.text, "Unlocked!");
        assert_eq!(reveal.markup.as_ref().unwrap().rows.len(), 2);
        assert!(script.reveal_for("something_else").is_none());
    }

    #[test]
    fn reveal_without_links_has_no_keyboard() {
        let config: CourierConfig = toml::from_str(
            r#"
            [script]
            reveal = { callback = "open_box", text = "Unlocked!" }
            "#,
        )
        .unwrap();
        let script = Script::compile(&config).unwrap();
        assert!(script.reveal_for("open_box").unwrap().markup.is_none());
    }

    #[test]
    fn followup_task_targets_recipient() {
        let task = script().followup_task(RecipientId(7)).unwrap();
        assert_eq!(task.recipient, RecipientId(7));
        assert_eq!(task.fire_after, Duration::from_secs(300));
        assert_eq!(task.payload.text, "Still there?");
        assert!(task.payload.markup.is_some());
    }

    #[test]
    fn unknown_asset_is_rejected() {
        let config: CourierConfig = toml::from_str(
            r#"
            [script]
            start_steps = [{ asset = "missing" }]
            "#,
        )
        .unwrap();
        let err = Script::compile(&config).unwrap_err();
        assert!(matches!(err, Error::UnknownAsset { step: 0, ref asset } if asset == "missing"));
    }

    #[test]
    fn empty_script_does_nothing() {
        let script = Script::compile(&CourierConfig::default()).unwrap();
        assert!(script.start_requests(RecipientId(1)).is_empty());
        assert!(script.followup_task(RecipientId(1)).is_none());
        assert!(script.reveal_for("open_box").is_none());
    }
}
