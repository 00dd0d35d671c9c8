use serde::Serialize;
use smashbot_core::session::{ControlTone, ItemCard, SessionView};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Button(ButtonElement),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        block_id: String,
        text: TextObject,
    },
    Actions {
        block_id: String,
        elements: Vec<BlockElement>,
    },
    Context {
        block_id: String,
        elements: Vec<TextObject>,
    },
    Image {
        block_id: String,
        image_url: String,
        alt_text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<TextObject>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(rename = "text")]
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    pub fn buttons(&self) -> impl Iterator<Item = &ButtonElement> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Actions { elements, .. } => Some(elements),
                _ => None,
            })
            .flatten()
            .map(|BlockElement::Button(button)| button)
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        let elements = builder.build();
        // Slack rejects an actions block with no elements.
        if !elements.is_empty() {
            self.blocks.push(Block::Actions { block_id: block_id.into(), elements });
        }
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn image(
        mut self,
        block_id: impl Into<String>,
        image_url: impl Into<String>,
        alt_text: impl Into<String>,
    ) -> Self {
        self.blocks.push(Block::Image {
            block_id: block_id.into(),
            image_url: image_url.into(),
            alt_text: alt_text.into(),
            title: None,
        });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(" "))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<BlockElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(BlockElement::Button(button));
        self
    }

    fn build(self) -> Vec<BlockElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Renders one session view. Every button carries `reply_id` as its value so clicks can be
/// routed back to the session that owns the reply.
///
/// Slack has no disabled button state, so disabled controls are left out.
pub fn session_message(view: &SessionView, reply_id: &str) -> MessageTemplate {
    let mut builder = MessageBuilder::new(view.content.clone())
        .section("smash.content.v1", |section| {
            section.mrkdwn(view.content.clone());
        });

    if let Some(card) = &view.card {
        builder = card_blocks(builder, card);
    }

    builder
        .actions("smash.controls.v1", |actions| {
            for control in view.controls.iter().filter(|control| control.enabled) {
                let mut button = ButtonElement::new(control.token.as_str(), control.label)
                    .value(reply_id);
                button.style = match control.tone {
                    ControlTone::Neutral => None,
                    ControlTone::Positive => Some(ButtonStyle::Primary),
                    ControlTone::Negative => Some(ButtonStyle::Danger),
                };
                actions.button(button);
            }
        })
        .build()
}

fn card_blocks(builder: MessageBuilder, card: &ItemCard) -> MessageBuilder {
    let mut builder = builder.section("smash.card.title.v1", |section| {
        section.mrkdwn(format!("*{}*", card.title));
    });

    if let Some(tally) = card.tally {
        builder = builder.section("smash.card.tally.v1", |section| {
            section.mrkdwn(format!("*Smashes:* {}    *Passes:* {}", tally.approve, tally.reject));
        });
    }

    builder = builder.image("smash.card.image.v1", card.image_url.clone(), card.title.clone());

    if let Some(description) = &card.description {
        builder = builder.context("smash.card.footer.v1", |context| {
            context.plain(description.clone());
        });
    }

    builder
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("bot.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("bot.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Smashbot command help")
        .section("bot.help.summary.v1", |section| {
            section.mrkdwn(
                "*Available commands*\n• `/smash` - play smash or pass\n• `/ping` - check the bot's latency\n• `/invite` - add the bot to your workspace",
            );
        })
        .build()
}

pub fn pinging_message() -> MessageTemplate {
    MessageBuilder::new("...Pinging!")
        .section("bot.ping.pending.v1", |section| {
            section.plain("...Pinging!");
        })
        .build()
}

pub fn pong_message(bot_latency_ms: Option<i64>, round_trip_ms: u128) -> MessageTemplate {
    let bot_latency =
        bot_latency_ms.map_or_else(|| "unknown".to_owned(), |latency| format!("{latency}ms"));
    let text = format!(":ping_pong: Pong! Bot latency: {bot_latency}, round trip: {round_trip_ms}ms");

    MessageBuilder::new(text.clone())
        .section("bot.ping.result.v1", |section| {
            section.mrkdwn(text);
        })
        .build()
}

pub fn invite_message(invite_url: &str) -> MessageTemplate {
    MessageBuilder::new(format!("Invite me to your workspace: {invite_url}"))
        .section("bot.invite.link.v1", |section| {
            section.mrkdwn(format!("<{invite_url}|Invite me to your workspace!>"));
        })
        .build()
}

#[cfg(test)]
mod tests {
    use smashbot_core::session::{reduce, start, ControlAction, Effect, SessionEvent};
    use smashbot_core::{Catalog, Item, VoteKind, VoteTally};

    use super::{error_message, session_message, Block, ButtonStyle, MessageBuilder, TextObject};

    fn wing_gundam() -> Item {
        Item::new(
            "Wing Gundam",
            vec!["wing-1.png".to_owned(), "wing-2.png".to_owned(), "wing-3.png".to_owned()],
        )
    }

    #[test]
    fn message_serializes_to_slack_block_kit_shape() {
        let message = MessageBuilder::new("fallback")
            .section("summary.v1", |section| {
                section.mrkdwn("*Summary*");
            })
            .actions("summary.actions.v1", |actions| {
                actions.button(super::ButtonElement::new("confirm.v1", "Confirm"));
            })
            .build();

        let json = serde_json::to_value(&message).expect("serialize");

        assert_eq!(json["text"], "fallback");
        assert_eq!(json["blocks"][0]["type"], "section");
        assert_eq!(json["blocks"][0]["text"]["type"], "mrkdwn");
        assert_eq!(json["blocks"][1]["type"], "actions");
        assert_eq!(json["blocks"][1]["elements"][0]["type"], "button");
        assert_eq!(json["blocks"][1]["elements"][0]["text"]["type"], "plain_text");
        assert_eq!(json["blocks"][1]["elements"][0]["action_id"], "confirm.v1");
    }

    #[test]
    fn browse_message_omits_disabled_previous_button_on_first_page() {
        let (session, view) = start("U1", wing_gundam());

        let message = session_message(&view, "reply-1");
        let labels: Vec<_> = message
            .buttons()
            .map(|button| match &button.text {
                TextObject::Plain { text } | TextObject::Mrkdwn { text } => text.as_str(),
            })
            .collect();

        assert_eq!(labels, vec!["Smash", "Pass", "Next Page ▶️"]);
        assert!(message.buttons().all(|button| button.value.as_deref() == Some("reply-1")));
        let next_token = session.controls.token_for(ControlAction::NextPage);
        assert!(message.buttons().any(|button| button.action_id == next_token.as_str()));
        assert!(message.blocks.iter().any(|block| matches!(
            block,
            Block::Image { image_url, .. } if image_url == "wing-1.png"
        )));
    }

    #[test]
    fn results_message_shows_both_totals_and_restart_controls() {
        let catalog = Catalog::new(vec![wing_gundam()]).expect("catalog");
        let mut rng = rand::thread_rng();
        let (session, _) = start("U1", wing_gundam());
        let approve = session.controls.token_for(ControlAction::Vote(VoteKind::Approve)).clone();
        let voted = reduce(
            session,
            SessionEvent::Click(approve),
            &catalog,
            &mut rng,
        );
        let recorded = reduce(
            voted.session,
            SessionEvent::VoteRecorded { kind: VoteKind::Approve, tally: VoteTally::new(6, 3) },
            &catalog,
            &mut rng,
        );
        let Effect::Render(view) = recorded.effect else {
            panic!("expected results render");
        };

        let message = session_message(&view, "reply-2");

        assert_eq!(message.fallback_text, "You voted smash! Smashes: 6, Passes: 3");
        assert!(message.blocks.iter().any(|block| matches!(
            block,
            Block::Section { text: TextObject::Mrkdwn { text }, .. }
                if text.contains("*Smashes:* 6") && text.contains("*Passes:* 3")
        )));
        let styles: Vec<_> = message.buttons().map(|button| button.style.clone()).collect();
        assert_eq!(styles, vec![Some(ButtonStyle::Primary), Some(ButtonStyle::Danger)]);
    }

    #[test]
    fn terminal_message_has_no_actions_block() {
        let catalog = Catalog::new(vec![wing_gundam()]).expect("catalog");
        let (session, _) = start("U1", wing_gundam());
        let ended = reduce(session, SessionEvent::IdleTimeout, &catalog, &mut rand::thread_rng());
        let Effect::Finish { view, .. } = ended.effect else {
            panic!("expected finish");
        };

        let message = session_message(&view, "reply-3");

        assert_eq!(message.fallback_text, "You've timed out!");
        assert_eq!(message.buttons().count(), 0);
        assert!(!message.blocks.iter().any(|block| matches!(block, Block::Actions { .. })));
    }

    #[test]
    fn error_template_contains_correlation_id() {
        let message = error_message("Cannot process request", "req-123");
        let elements = if let Block::Context { elements, .. } = &message.blocks[1] {
            Some(elements)
        } else {
            None
        };
        assert!(elements.is_some(), "expected context block");
        let elements = elements.expect("context block asserted above");
        assert!(matches!(
            elements.first(),
            Some(TextObject::Plain { text }) if text.contains("req-123")
        ));
    }
}
