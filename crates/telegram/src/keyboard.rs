use {
    courier_common::{ButtonAction, Markup},
    teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup},
};

/// Convert a button layout into a Telegram inline keyboard, row for row.
pub fn inline_keyboard(markup: &Markup) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = markup
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match button.action {
                    ButtonAction::Callback(ref data) => {
                        InlineKeyboardButton::callback(button.label.clone(), data.clone())
                    },
                    ButtonAction::Url(ref url) => {
                        InlineKeyboardButton::url(button.label.clone(), url.clone())
                    },
                })
                .collect()
        })
        .filter(|row: &Vec<InlineKeyboardButton>| !row.is_empty())
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        courier_common::Button,
        teloxide::types::InlineKeyboardButtonKind,
    };

    #[test]
    fn preserves_rows_and_actions() {
        let markup = Markup {
            rows: vec![
                vec![Button::callback("Open my box", "open_box")],
                vec![
                    Button::url("Create account", "https://example.com/signup".parse().unwrap()),
                    Button::url("Join", "https://t.me/+invite".parse().unwrap()),
                ],
            ],
        };

        let keyboard = inline_keyboard(&markup);
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[1].len(), 2);

        let open = &keyboard.inline_keyboard[0][0];
        assert_eq!(open.text, "Open my box");
        assert!(matches!(
            open.kind,
            InlineKeyboardButtonKind::CallbackData(ref d) if d == "open_box"
        ));

        let join = &keyboard.inline_keyboard[1][1];
        assert!(matches!(
            join.kind,
            InlineKeyboardButtonKind::Url(ref u) if u.as_str() == "https://t.me/+invite"
        ));
    }

    #[test]
    fn empty_rows_are_dropped() {
        let markup = Markup {
            rows: vec![vec![], vec![Button::callback("A", "a")], vec![]],
        };
        assert_eq!(inline_keyboard(&markup).inline_keyboard.len(), 1);
    }
}
