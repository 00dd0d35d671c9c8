use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use smashbot_core::session::ControlToken;
use smashbot_core::ApplicationError;
use thiserror::Error;
use tracing::warn;

use crate::{
    blocks::{self, MessageTemplate},
    collector::{ClickEvent, CollectorRegistry, RouteOutcome},
    commands::{
        normalize_bot_command, BotCommandService, CommandParseError, CommandReply,
        CommandRouteError, CommandRouter, SlashCommandPayload,
    },
    surface::{ReplyError, SurfaceFactory},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    BlockAction(BlockActionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    BlockAction,
    Unsupported,
}

/// One clicked button. `action_id` is the control token and `value` the reply id it was
/// rendered into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub user_id: String,
    pub action_id: String,
    pub value: Option<String>,
    pub response_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error(transparent)]
    Reply(#[from] ReplyError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn build_dispatcher<S>(
    service: S,
    surfaces: Arc<dyn SurfaceFactory>,
    registry: Arc<CollectorRegistry>,
) -> EventDispatcher
where
    S: BotCommandService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(service, surfaces));
    dispatcher.register(BlockActionHandler::new(registry));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
    surfaces: Arc<dyn SurfaceFactory>,
}

impl<S> SlashCommandHandler<S>
where
    S: BotCommandService,
{
    pub fn new(service: S, surfaces: Arc<dyn SurfaceFactory>) -> Self {
        Self { router: CommandRouter::new(service), surfaces }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: BotCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_bot_command(payload.clone())?;
        let message = match self.router.route(normalized).await {
            Ok(CommandReply::Delivered) => return Ok(HandlerResult::Processed),
            Ok(CommandReply::Message(message)) => message,
            Err(CommandRouteError::Service(detail)) => {
                let interface = ApplicationError::Integration(detail)
                    .into_interface(ctx.correlation_id.clone());
                warn!(
                    event_name = "ingress.slack.command_failed",
                    correlation_id = %ctx.correlation_id,
                    command = %payload.command,
                    error = %interface,
                    "slash command failed"
                );
                blocks::error_message(interface.user_message(), interface.correlation_id())
            }
        };

        self.surfaces.for_command(payload).send_private(&message).await?;
        Ok(HandlerResult::Responded(message))
    }
}

#[async_trait]
pub trait BlockActionService: Send + Sync {
    async fn handle_block_action(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<RouteOutcome, EventHandlerError>;
}

#[async_trait]
impl BlockActionService for CollectorRegistry {
    async fn handle_block_action(
        &self,
        event: &BlockActionEvent,
        _ctx: &EventContext,
    ) -> Result<RouteOutcome, EventHandlerError> {
        let Some(reply_id) = event.value.as_deref() else {
            return Ok(RouteOutcome::NoSubscriber);
        };

        let click = ClickEvent {
            user_id: event.user_id.clone(),
            token: ControlToken(event.action_id.clone()),
            response_url: event.response_url.clone(),
        };
        Ok(self.route(reply_id, click))
    }
}

pub struct BlockActionHandler<S: ?Sized> {
    service: Arc<S>,
}

impl<S> BlockActionHandler<S>
where
    S: BlockActionService + ?Sized,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for BlockActionHandler<S>
where
    S: BlockActionService + ?Sized + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        Ok(match self.service.handle_block_action(event, ctx).await? {
            RouteOutcome::Delivered => HandlerResult::Processed,
            RouteOutcome::Unauthorized | RouteOutcome::NoSubscriber => HandlerResult::Ignored,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{
        build_dispatcher, BlockActionEvent, EventContext, EventDispatcher, HandlerResult,
        SlackEnvelope, SlackEvent,
    };
    use crate::collector::{CollectorRegistry, SubscriptionEvent};
    use crate::commands::{BotCommandService, CommandEnvelope, CommandReply, CommandRouteError};
    use crate::test_support::{slash_payload, RecordingSurfaces};

    struct FailingService;

    #[async_trait::async_trait]
    impl BotCommandService for FailingService {
        async fn start_session(
            &self,
            _envelope: &CommandEnvelope,
        ) -> Result<CommandReply, CommandRouteError> {
            Err(CommandRouteError::Service("catalog offline".to_owned()))
        }

        async fn ping(&self, _envelope: &CommandEnvelope) -> Result<CommandReply, CommandRouteError> {
            Ok(CommandReply::Delivered)
        }

        async fn invite(
            &self,
            _envelope: &CommandEnvelope,
        ) -> Result<CommandReply, CommandRouteError> {
            Ok(CommandReply::Delivered)
        }
    }

    fn block_action(user_id: &str, token: &str, reply_id: Option<&str>) -> SlackEnvelope {
        SlackEnvelope {
            envelope_id: "env-block".to_owned(),
            event: SlackEvent::BlockAction(BlockActionEvent {
                user_id: user_id.to_owned(),
                action_id: token.to_owned(),
                value: reply_id.map(str::to_owned),
                response_url: None,
            }),
        }
    }

    #[tokio::test]
    async fn dispatcher_answers_help_through_the_command_surface() {
        let surfaces = Arc::new(RecordingSurfaces::default());
        let dispatcher = build_dispatcher(FailingService, surfaces.clone(), CollectorRegistry::new());
        let envelope = SlackEnvelope {
            envelope_id: "env-1".to_owned(),
            event: SlackEvent::SlashCommand({
                let mut payload = slash_payload("/smash", "U1");
                payload.text = "help".to_owned();
                payload
            }),
        };

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert!(matches!(result, HandlerResult::Responded(_)));
        assert_eq!(surfaces.sent_texts(), vec!["Smashbot command help".to_owned()]);
    }

    #[tokio::test]
    async fn service_failure_becomes_user_safe_error_card() {
        let surfaces = Arc::new(RecordingSurfaces::default());
        let dispatcher = build_dispatcher(FailingService, surfaces.clone(), CollectorRegistry::new());
        let envelope = SlackEnvelope {
            envelope_id: "env-2".to_owned(),
            event: SlackEvent::SlashCommand(slash_payload("/smash", "U1")),
        };
        let ctx = EventContext { correlation_id: "env-2".to_owned() };

        let result = dispatcher.dispatch(&envelope, &ctx).await.expect("dispatch");

        let HandlerResult::Responded(message) = result else {
            panic!("expected an error card");
        };
        assert_eq!(message.fallback_text, "Something went wrong! Please try again later.");
        assert!(!format!("{message:?}").contains("catalog offline"));
        assert!(format!("{message:?}").contains("env-2"));
    }

    #[tokio::test]
    async fn dispatcher_returns_ignored_when_no_handler_registered() {
        let dispatcher = EventDispatcher::new();

        let result = dispatcher
            .dispatch(&block_action("U1", "smash.a", Some("reply-1")), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn block_actions_reach_only_the_owning_subscription() {
        let registry = CollectorRegistry::new();
        let dispatcher = build_dispatcher(
            FailingService,
            Arc::new(RecordingSurfaces::default()),
            Arc::clone(&registry),
        );
        let mut subscription = registry.subscribe("reply-1", "U1", Duration::from_secs(30));

        let intruder = dispatcher
            .dispatch(&block_action("U2", "smash.a", Some("reply-1")), &EventContext::default())
            .await
            .expect("dispatch");
        let unrouted = dispatcher
            .dispatch(&block_action("U1", "smash.a", None), &EventContext::default())
            .await
            .expect("dispatch");
        let owner = dispatcher
            .dispatch(&block_action("U1", "smash.b", Some("reply-1")), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(intruder, HandlerResult::Ignored);
        assert_eq!(unrouted, HandlerResult::Ignored);
        assert_eq!(owner, HandlerResult::Processed);
        assert!(matches!(
            subscription.next().await,
            SubscriptionEvent::Click(click) if click.token.as_str() == "smash.b"
        ));
    }

    #[test]
    fn built_dispatcher_registers_both_handlers() {
        let dispatcher = build_dispatcher(
            FailingService,
            Arc::new(RecordingSurfaces::default()),
            CollectorRegistry::new(),
        );
        assert_eq!(dispatcher.handler_count(), 2);
    }
}
