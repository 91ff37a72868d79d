//! One live trading group
//!
//! Every event runs load -> validate -> match -> settle -> save -> project
//! inside the group's lock and publishes its messages before releasing it, so
//! concurrent submissions from the same group are applied one at a time and
//! participants see updates in the order events were applied.

use crate::broadcaster::{Broadcast, Broadcaster};
use crate::error::{GatewayError, GatewayResult};
use crate::messages::{InboundAction, OutboundMessage, UpdateMessage};
use auction::{
    Account, AuctionConfig, GroupKey, GroupState, Market, MarketError, MarketStateView, Notification, Outcome,
    ParticipantId, ResourceAccessor, Roster, RoundClock, RoundContext,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use persistence::GroupStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stage-specific data attached to every update (cost tables, private item values)
pub type DetailFn<P> = dyn Fn(&P, &RoundContext) -> Option<serde_json::Value> + Send + Sync;

struct Session<P> {
    key: GroupKey,
    round: RoundContext,
    roster: Roster<P>,
}

pub struct LiveMarket<P> {
    config: AuctionConfig,
    accessor: Arc<dyn ResourceAccessor<P>>,
    store: Arc<dyn GroupStore>,
    broadcaster: Arc<Broadcaster>,
    details: Option<Arc<DetailFn<P>>>,
    session: Mutex<Session<P>>,
}

impl<P: Account + Clone + Send> LiveMarket<P> {
    /// Create a group market with an empty roster. Call [`start_round`](Self::start_round) before trading.
    pub fn new(
        key: GroupKey,
        config: AuctionConfig,
        accessor: Arc<dyn ResourceAccessor<P>>,
        store: Arc<dyn GroupStore>,
    ) -> GatewayResult<Self> {
        config.validate().map_err(|e| GatewayError::Config(format!("{e:?}")))?;
        let round = RoundContext::new(key.round, RoundClock::default(), 0);
        Ok(Self {
            config,
            accessor,
            store,
            broadcaster: Arc::new(Broadcaster::new()),
            details: None,
            session: Mutex::new(Session { key, round, roster: Roster::new() }),
        })
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<Broadcaster>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    pub fn with_details(mut self, details: Arc<DetailFn<P>>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn key(&self) -> GroupKey {
        self.session.lock().key.clone()
    }

    pub fn round(&self) -> RoundContext {
        self.session.lock().round
    }

    /// Begin a round: install its participants and start from an empty book.
    pub fn start_round(&self, round: RoundContext, roster: Roster<P>) -> GatewayResult<()> {
        let mut session = self.session.lock();
        let key = GroupKey::new(session.key.stage.clone(), round.round, session.key.group);
        self.store.reset(&key)?;
        info!(group = %key, participants = roster.len(), "round started");
        *session = Session { key, round, roster };
        Ok(())
    }

    /// Apply one participant action and publish the resulting messages.
    pub fn handle(&self, actor: ParticipantId, action: InboundAction, now: DateTime<Utc>) -> GatewayResult<Broadcast> {
        let mut guard = self.session.lock();
        let session = &mut *guard;

        if !session.roster.contains_key(&actor) {
            warn!(group = %session.key, actor, action = action.name(), "action from unknown participant");
            let mut out = Broadcast::new();
            out.insert(actor, OutboundMessage::Error { message: GatewayError::UnknownParticipant(actor).to_string() });
            self.broadcaster.publish(&out)?;
            return Ok(out);
        }

        let mut state = self.store.load(&session.key);
        let checkpoint = session.roster.clone();
        let (result, views) = {
            let mut market = Market {
                state: &mut state,
                roster: &mut session.roster,
                accessor: &*self.accessor,
                round: &session.round,
                config: &self.config,
                now,
            };
            let result = apply(&mut market, actor, &action);
            (result, market.project_all())
        };

        if !matches!(result, Ok(None)) {
            self.commit(session, &state, checkpoint)?;
        }

        let out = match result {
            Ok(None) => self.messages(session, views.into_iter().filter(|(id, _)| *id == actor)),
            Ok(Some(outcome)) => {
                debug!(group = %session.key, actor, action = action.name(), ?outcome, "action applied");
                let mut notes = outcome.notifications(actor, self.accessor.label());
                let recipients = views.into_iter().map(|(id, view)| {
                    let note = notes.remove(&id);
                    (id, view.with_notification(note))
                });
                self.messages(session, recipients)
            }
            Err(e) => {
                info!(group = %session.key, actor, action = action.name(), error = %e, "action rejected");
                let own = views.into_iter().filter(|(id, _)| *id == actor);
                let own = own.map(|(id, view)| (id, view.with_notification(Some(Notification::error(e.to_string())))));
                self.messages(session, own)
            }
        };

        self.broadcaster.publish(&out)?;
        Ok(out)
    }

    /// Parse a raw message and apply it. Unparseable text is answered to the sender only.
    pub fn handle_text(&self, actor: ParticipantId, text: &str, now: DateTime<Utc>) -> GatewayResult<Broadcast> {
        match InboundAction::parse(text) {
            Ok(action) => self.handle(actor, action, now),
            Err(e) => {
                debug!(actor, error = %e, "unparseable message");
                self.reject(actor, format!("Invalid message: {e}"))
            }
        }
    }

    /// Trading window expired: withdraw every order, floor balances, refresh everyone.
    pub fn close_round(&self, now: DateTime<Utc>) -> GatewayResult<Broadcast> {
        let mut guard = self.session.lock();
        let session = &mut *guard;

        let mut state = self.store.load(&session.key);
        let checkpoint = session.roster.clone();
        let views = {
            let mut market = Market {
                state: &mut state,
                roster: &mut session.roster,
                accessor: &*self.accessor,
                round: &session.round,
                config: &self.config,
                now,
            };
            market.close_on_timeout();
            market.project_all()
        };
        self.commit(session, &state, checkpoint)?;

        let out = self.messages(session, views);
        self.broadcaster.publish(&out)?;
        Ok(out)
    }

    /// Current persisted state of the group
    pub fn snapshot(&self) -> GroupState {
        let session = self.session.lock();
        self.store.load(&session.key)
    }

    pub fn participant(&self, participant_id: ParticipantId) -> Option<P> {
        self.session.lock().roster.get(&participant_id).cloned()
    }

    pub fn roster(&self) -> Roster<P> {
        self.session.lock().roster.clone()
    }

    /// Persist `state`. Balances move in memory before the save, so a failed
    /// save puts the roster back to `checkpoint` to stay in step with the store.
    fn commit(&self, session: &mut Session<P>, state: &GroupState, checkpoint: Roster<P>) -> GatewayResult<()> {
        if let Err(e) = self.store.save(&session.key, state) {
            warn!(group = %session.key, error = %e, "group state not saved; balances restored");
            session.roster = checkpoint;
            return Err(e.into());
        }
        Ok(())
    }

    fn reject(&self, actor: ParticipantId, message: String) -> GatewayResult<Broadcast> {
        let session = self.session.lock();
        let mut out = Broadcast::new();
        let msg = match session.roster.get(&actor) {
            Some(p) => {
                let state = self.store.load(&session.key);
                let view = auction::projector::project(&state, p, &*self.accessor, &self.config)
                    .with_notification(Some(Notification::error(message)));
                self.update(view, p, &session.round)
            }
            None => OutboundMessage::Error { message },
        };
        out.insert(actor, msg);
        self.broadcaster.publish(&out)?;
        Ok(out)
    }

    fn messages(
        &self,
        session: &Session<P>,
        views: impl IntoIterator<Item = (ParticipantId, MarketStateView)>,
    ) -> Broadcast {
        views
            .into_iter()
            .filter_map(|(id, view)| {
                let p = session.roster.get(&id)?;
                Some((id, self.update(view, p, &session.round)))
            })
            .collect::<BTreeMap<_, _>>()
    }

    fn update(&self, view: MarketStateView, participant: &P, round: &RoundContext) -> OutboundMessage {
        let details = self.details.as_ref().and_then(|f| f(participant, round));
        OutboundMessage::Update(Box::new(UpdateMessage { view, details }))
    }
}

/// `Ok(None)` for actions that change nothing.
fn apply<P: Account>(
    market: &mut Market<'_, P>,
    actor: ParticipantId,
    action: &InboundAction,
) -> Result<Option<Outcome>, MarketError> {
    let outcome = match *action {
        InboundAction::SubmitOffer { direction, price, quantity } => market.submit(actor, direction, price, quantity)?,
        InboundAction::AcceptOffer { offer_type, player_id, price, quantity } => {
            market.accept(actor, offer_type, player_id, price, quantity)?
        }
        InboundAction::CancelOffer { direction, price, quantity } => market.cancel(actor, direction, price, quantity)?,
        InboundAction::Ping => return Ok(None),
    };
    Ok(Some(outcome))
}
