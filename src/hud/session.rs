//! Visibility state machine
//!
//! `Hidden -> GracePending -> Visible -> Dismissing -> Hidden`.
//!
//! The session never touches the clock or the renderer itself. Every entry
//! point returns the [`Effect`]s the driver must carry out, in order. Timers
//! are identified by a [`TimerToken`]; arming a timer invalidates the
//! previous token synchronously, so a late fire of a superseded timer is
//! ignored.

use crate::config::Configuration;
use crate::content::Content;
use crate::renderer::RenderError;
use std::collections::HashMap;
use std::time::Duration;

/// Callback run after a show is acknowledged or a dismiss completes.
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Hidden,
    /// Waiting out the grace period before presenting.
    GracePending,
    Visible,
    /// Hide animation running.
    Dismissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Grace,
    AutoDismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// Identifies one renderer instruction awaiting acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AckId(u64);

impl AckId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Instruction for the driver.
pub enum Effect {
    Present { config: Configuration, content: Content, ack: AckId },
    UpdateContent { config: Configuration, content: Content, ack: AckId },
    Hide { ack: AckId },
    ArmTimer { timer: TimerKind, token: TimerToken, after: Duration },
    DisarmTimer { timer: TimerKind },
    Complete(Completion),
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Present { content, ack, .. } => write!(f, "Present({}, {:?})", content.kind(), ack),
            Effect::UpdateContent { content, ack, .. } => {
                write!(f, "UpdateContent({}, {:?})", content.kind(), ack)
            }
            Effect::Hide { ack } => write!(f, "Hide({:?})", ack),
            Effect::ArmTimer { timer, token, after } => {
                write!(f, "ArmTimer({:?}, {:?}, {:?})", timer, token, after)
            }
            Effect::DisarmTimer { timer } => write!(f, "DisarmTimer({:?})", timer),
            Effect::Complete(_) => write!(f, "Complete"),
        }
    }
}

/// What an outstanding acknowledgement resolves.
enum Pending {
    Shown(Option<Completion>),
    Updated,
    Hidden,
}

/// A show that arrived while the hide animation was running.
struct Queued {
    content: Content,
    config: Configuration,
    completion: Option<Completion>,
}

#[derive(Default)]
pub struct Session {
    phase: Phase,
    content: Option<Content>,
    config: Option<Configuration>,
    /// An overlay is on screen (presented and not yet hidden).
    on_screen: bool,
    grace: Option<TimerToken>,
    auto_dismiss: Option<TimerToken>,
    next_token: u64,
    next_ack: u64,
    pending: HashMap<AckId, Pending>,
    /// Completion of the show waiting out its grace period.
    grace_completion: Option<Completion>,
    dismiss_completions: Vec<Completion>,
    queued: Option<Queued>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn config(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.on_screen
    }

    pub fn timer(&self, kind: TimerKind) -> Option<TimerToken> {
        match kind {
            TimerKind::Grace => self.grace,
            TimerKind::AutoDismiss => self.auto_dismiss,
        }
    }

    // ============ Entry points ============

    pub fn show(
        &mut self,
        content: Content,
        config: Configuration,
        completion: Option<Completion>,
    ) -> Vec<Effect> {
        let mut out = Vec::new();

        if self.phase == Phase::Dismissing {
            if self.queued.is_some() {
                log::debug!("[Hud] Queued show superseded during hide");
            }
            self.queued = Some(Queued { content, config, completion });
            return out;
        }

        self.cancel_timers(&mut out);
        if self.grace_completion.take().is_some() {
            log::debug!("[Hud] Grace-pending show superseded");
        }

        let grace = config.grace_period();
        self.content = Some(content);
        self.config = Some(config);

        match grace {
            None => self.enter_visible(completion, &mut out),
            Some(after) => {
                log::debug!("[Hud] Grace period {:?} started", after);
                self.phase = Phase::GracePending;
                self.grace_completion = completion;
                let token = self.arm(TimerKind::Grace, after, &mut out);
                self.grace = Some(token);
            }
        }
        out
    }

    pub fn update(&mut self, message: &str) -> Vec<Effect> {
        let mut out = Vec::new();
        match self.phase {
            Phase::Visible => {
                if let (Some(content), Some(config)) = (self.content.as_mut(), self.config.as_ref()) {
                    content.set_message(message);
                    let ack = next_ack(&mut self.next_ack);
                    self.pending.insert(ack, Pending::Updated);
                    out.push(Effect::UpdateContent {
                        config: config.clone(),
                        content: content.clone(),
                        ack,
                    });
                }
            }
            Phase::GracePending => {
                // not presented yet; the new text goes out when grace ends
                if let Some(content) = self.content.as_mut() {
                    content.set_message(message);
                }
            }
            Phase::Hidden | Phase::Dismissing => {
                log::debug!("[Hud] update({:?}) ignored while {:?}", message, self.phase);
            }
        }
        out
    }

    pub fn dismiss(&mut self, completion: Option<Completion>) -> Vec<Effect> {
        let mut out = Vec::new();
        match self.phase {
            Phase::Hidden => {
                if let Some(completion) = completion {
                    out.push(Effect::Complete(completion));
                }
            }
            Phase::Dismissing => {
                if self.queued.take().is_some() {
                    log::debug!("[Hud] Queued show cancelled by dismiss");
                }
                self.dismiss_completions.extend(completion);
            }
            Phase::GracePending | Phase::Visible => {
                self.cancel_timers(&mut out);
                if self.grace_completion.take().is_some() {
                    log::debug!("[Hud] Dismissed before grace period elapsed");
                }
                if self.on_screen {
                    self.phase = Phase::Dismissing;
                    self.dismiss_completions.extend(completion);
                    let ack = next_ack(&mut self.next_ack);
                    self.pending.insert(ack, Pending::Hidden);
                    out.push(Effect::Hide { ack });
                } else {
                    // nothing was ever presented, so there is nothing to animate out
                    self.clear();
                    out.extend(completion.map(Effect::Complete));
                }
            }
        }
        out
    }

    pub fn timer_fired(&mut self, kind: TimerKind, token: TimerToken) -> Vec<Effect> {
        let mut out = Vec::new();
        match kind {
            TimerKind::Grace => {
                if self.grace != Some(token) {
                    log::debug!("[Hud] Stale grace timer {:?} ignored", token);
                    return out;
                }
                self.grace = None;
                if self.phase == Phase::GracePending {
                    let completion = self.grace_completion.take();
                    self.enter_visible(completion, &mut out);
                }
            }
            TimerKind::AutoDismiss => {
                if self.auto_dismiss != Some(token) {
                    log::debug!("[Hud] Stale dismiss timer {:?} ignored", token);
                    return out;
                }
                self.auto_dismiss = None;
                log::debug!("[Hud] Auto-dismiss");
                out = self.dismiss(None);
            }
        }
        out
    }

    pub fn acknowledged(&mut self, ack: AckId, result: Result<(), RenderError>) -> Vec<Effect> {
        let mut out = Vec::new();
        let Some(pending) = self.pending.remove(&ack) else {
            log::debug!("[Hud] Late acknowledgement {:?} ignored", ack);
            return out;
        };

        if let Err(err) = result {
            log::error!("[Hud] Renderer failed ({}), forcing reset to hidden", err);
            self.force_reset(!matches!(pending, Pending::Hidden), &mut out);
            return out;
        }

        match pending {
            Pending::Shown(completion) => out.extend(completion.map(Effect::Complete)),
            Pending::Updated => {}
            Pending::Hidden => {
                if self.phase != Phase::Dismissing {
                    return out;
                }
                self.clear();
                log::info!("[Hud] Hidden");
                out.extend(self.dismiss_completions.drain(..).map(Effect::Complete));
                if let Some(queued) = self.queued.take() {
                    out.extend(self.show(queued.content, queued.config, queued.completion));
                }
            }
        }
        out
    }

    // ============ Internals ============

    fn enter_visible(&mut self, completion: Option<Completion>, out: &mut Vec<Effect>) {
        let (Some(content), Some(config)) = (self.content.clone(), self.config.clone()) else {
            return;
        };

        let ack = next_ack(&mut self.next_ack);
        self.pending.insert(ack, Pending::Shown(completion));
        let auto_dismiss = content.auto_dismisses().then(|| config.auto_dismiss_after());

        if self.on_screen {
            out.push(Effect::UpdateContent { config, content, ack });
        } else {
            log::info!("[Hud] Presenting {}", content.kind());
            self.on_screen = true;
            out.push(Effect::Present { config, content, ack });
        }
        self.phase = Phase::Visible;

        if let Some(after) = auto_dismiss {
            let token = self.arm(TimerKind::AutoDismiss, after, out);
            self.auto_dismiss = Some(token);
        }
    }

    fn arm(&mut self, timer: TimerKind, after: Duration, out: &mut Vec<Effect>) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        out.push(Effect::ArmTimer { timer, token, after });
        token
    }

    fn cancel_timers(&mut self, out: &mut Vec<Effect>) {
        if self.grace.take().is_some() {
            out.push(Effect::DisarmTimer { timer: TimerKind::Grace });
        }
        if self.auto_dismiss.take().is_some() {
            out.push(Effect::DisarmTimer { timer: TimerKind::AutoDismiss });
        }
    }

    fn clear(&mut self) {
        self.phase = Phase::Hidden;
        self.content = None;
        self.config = None;
        self.on_screen = false;
    }

    fn force_reset(&mut self, hide: bool, out: &mut Vec<Effect>) {
        self.cancel_timers(out);
        if hide && self.on_screen {
            // best effort; never tracked
            let ack = next_ack(&mut self.next_ack);
            out.push(Effect::Hide { ack });
        }
        self.clear();
        self.grace_completion = None;
        self.queued = None;
        self.pending.clear();
        out.extend(self.dismiss_completions.drain(..).map(Effect::Complete));
    }
}

fn next_ack(counter: &mut u64) -> AckId {
    *counter += 1;
    AckId(*counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::IconType;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config(grace: f64) -> Configuration {
        Configuration { grace_time: grace, ..Configuration::default() }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Completion) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = count.clone();
            move || -> Completion {
                let count = count.clone();
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }
        };
        (count, make)
    }

    fn run(effects: Vec<Effect>) -> Vec<Effect> {
        effects
            .into_iter()
            .filter_map(|e| match e {
                Effect::Complete(c) => {
                    c();
                    None
                }
                other => Some(other),
            })
            .collect()
    }

    fn present_ack(effects: &[Effect]) -> Option<AckId> {
        effects.iter().find_map(|e| match e {
            Effect::Present { ack, .. } | Effect::UpdateContent { ack, .. } => Some(*ack),
            _ => None,
        })
    }

    fn hide_ack(effects: &[Effect]) -> Option<AckId> {
        effects.iter().find_map(|e| match e {
            Effect::Hide { ack } => Some(*ack),
            _ => None,
        })
    }

    fn armed(effects: &[Effect], kind: TimerKind) -> Option<(TimerToken, Duration)> {
        effects.iter().find_map(|e| match e {
            Effect::ArmTimer { timer, token, after } if *timer == kind => Some((*token, *after)),
            _ => None,
        })
    }

    #[test]
    fn test_show_without_grace_presents_immediately() {
        let mut session = Session::new();
        let (count, completion) = counter();

        let effects = session.show(Content::loading(Some("Loading")), config(0.0), Some(completion()));
        assert_eq!(session.phase(), Phase::Visible);
        assert!(matches!(effects[0], Effect::Present { .. }));
        assert!(armed(&effects, TimerKind::AutoDismiss).is_none());

        // completion waits for the renderer
        assert_eq!(count.load(Ordering::SeqCst), 0);
        run(session.acknowledged(present_ack(&effects).unwrap(), Ok(())));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_glyph_arms_auto_dismiss_for_duration() {
        let mut session = Session::new();
        let cfg = Configuration { duration: 2.5, ..Configuration::default() };

        let effects = session.show(Content::glyph(IconType::Success, Some("Done")), cfg, None);
        let (token, after) = armed(&effects, TimerKind::AutoDismiss).unwrap();
        assert_eq!(after, Duration::from_millis(2500));

        let effects = session.timer_fired(TimerKind::AutoDismiss, token);
        assert_eq!(session.phase(), Phase::Dismissing);
        let ack = hide_ack(&effects).unwrap();

        session.acknowledged(ack, Ok(()));
        assert_eq!(session.phase(), Phase::Hidden);
        assert!(session.content().is_none());
        assert!(session.config().is_none());
    }

    #[test]
    fn test_dismiss_during_grace_never_presents() {
        let mut session = Session::new();
        let (count, completion) = counter();

        let effects = session.show(Content::loading(None), config(0.5), None);
        assert_eq!(session.phase(), Phase::GracePending);
        let (token, _) = armed(&effects, TimerKind::Grace).unwrap();

        let effects = run(session.dismiss(Some(completion())));
        assert_eq!(session.phase(), Phase::Hidden);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(effects
            .iter()
            .all(|e| !matches!(e, Effect::Present { .. } | Effect::Hide { .. })));

        // the timer's queued fire must be a no-op
        assert!(session.timer_fired(TimerKind::Grace, token).is_empty());
        assert_eq!(session.phase(), Phase::Hidden);
    }

    #[test]
    fn test_grace_elapsing_presents_pending_content() {
        let mut session = Session::new();
        let effects = session.show(Content::loading(Some("Syncing")), config(0.5), None);
        let (token, _) = armed(&effects, TimerKind::Grace).unwrap();

        session.update("Still syncing");
        let effects = session.timer_fired(TimerKind::Grace, token);

        assert_eq!(session.phase(), Phase::Visible);
        match &effects[0] {
            Effect::Present { content, .. } => assert_eq!(content.message(), Some("Still syncing")),
            other => panic!("expected present, got {:?}", other),
        }
    }

    #[test]
    fn test_superseding_show_invalidates_old_timers() {
        let mut session = Session::new();
        let first = session.show(Content::text("one"), config(0.0), None);
        let (old, _) = armed(&first, TimerKind::AutoDismiss).unwrap();

        let second = session.show(Content::text("two"), config(0.0), None);
        assert!(matches!(second[0], Effect::DisarmTimer { timer: TimerKind::AutoDismiss }));
        // already on screen: updated in place
        assert!(matches!(second[1], Effect::UpdateContent { .. }));
        let (new, _) = armed(&second, TimerKind::AutoDismiss).unwrap();
        assert_ne!(old, new);

        assert!(session.timer_fired(TimerKind::AutoDismiss, old).is_empty());
        assert_eq!(session.phase(), Phase::Visible);
        assert_eq!(session.content(), Some(&Content::text("two")));
    }

    #[test]
    fn test_superseded_grace_show_drops_its_completion() {
        let mut session = Session::new();
        let (count, completion) = counter();

        session.show(Content::loading(Some("a")), config(1.0), Some(completion()));
        let effects = session.show(Content::loading(Some("b")), config(0.0), None);
        run(session.acknowledged(present_ack(&effects).unwrap(), Ok(())));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(session.content(), Some(&Content::loading(Some("b"))));
    }

    #[test]
    fn test_update_changes_only_message() {
        let mut session = Session::new();
        let effects = session.show(Content::glyph(IconType::Success, Some("Saving")), config(0.0), None);
        let timer = session.timer(TimerKind::AutoDismiss);
        assert!(timer.is_some());
        session.acknowledged(present_ack(&effects).unwrap(), Ok(()));

        let effects = session.update("New text");
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::UpdateContent { .. }));
        assert_eq!(session.content(), Some(&Content::glyph(IconType::Success, Some("New text"))));
        assert_eq!(session.timer(TimerKind::AutoDismiss), timer);
        assert_eq!(session.phase(), Phase::Visible);
    }

    #[test]
    fn test_update_while_hidden_is_noop() {
        let mut session = Session::new();
        assert!(session.update("nobody home").is_empty());
        assert_eq!(session.phase(), Phase::Hidden);
        assert!(session.content().is_none());
    }

    #[test]
    fn test_dismiss_while_hidden_completes_each_call() {
        let mut session = Session::new();
        let (count, completion) = counter();

        run(session.dismiss(Some(completion())));
        run(session.dismiss(Some(completion())));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(session.phase(), Phase::Hidden);
    }

    #[test]
    fn test_dismisses_during_hide_collapse() {
        let mut session = Session::new();
        let (count, completion) = counter();
        session.show(Content::loading(None), config(0.0), None);

        let effects = session.dismiss(Some(completion()));
        let ack = hide_ack(&effects).unwrap();
        let again = session.dismiss(Some(completion()));
        assert!(again.is_empty());

        run(session.acknowledged(ack, Ok(())));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(session.phase(), Phase::Hidden);
    }

    #[test]
    fn test_show_during_hide_runs_after_acknowledgement() {
        let mut session = Session::new();
        session.show(Content::loading(None), config(0.0), None);
        let ack = hide_ack(&session.dismiss(None)).unwrap();

        assert!(session.show(Content::text("first"), config(0.0), None).is_empty());
        assert!(session.show(Content::text("latest"), config(0.0), None).is_empty());
        assert_eq!(session.phase(), Phase::Dismissing);

        let effects = session.acknowledged(ack, Ok(()));
        assert_eq!(session.phase(), Phase::Visible);
        match &effects[0] {
            Effect::Present { content, .. } => assert_eq!(content, &Content::text("latest")),
            other => panic!("expected present, got {:?}", other),
        }
    }

    #[test]
    fn test_dismiss_after_queued_show_wins() {
        let mut session = Session::new();
        session.show(Content::loading(None), config(0.0), None);
        let ack = hide_ack(&session.dismiss(None)).unwrap();

        session.show(Content::text("later"), config(0.0), None);
        session.dismiss(None);

        let effects = session.acknowledged(ack, Ok(()));
        assert!(effects.is_empty());
        assert_eq!(session.phase(), Phase::Hidden);
    }

    #[test]
    fn test_renderer_failure_forces_hidden() {
        let mut session = Session::new();
        let (count, completion) = counter();

        let effects = session.show(Content::text("hi"), config(0.0), Some(completion()));
        let ack = present_ack(&effects).unwrap();

        let effects = run(session.acknowledged(ack, Err(RenderError::Dropped)));
        assert_eq!(session.phase(), Phase::Hidden);
        assert!(session.timer(TimerKind::AutoDismiss).is_none());
        assert!(effects.iter().any(|e| matches!(e, Effect::DisarmTimer { .. })));
        assert!(hide_ack(&effects).is_some());
        // presentation was never acknowledged
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_hide_still_completes_dismiss() {
        let mut session = Session::new();
        let (count, completion) = counter();
        session.show(Content::loading(None), config(0.0), None);
        let ack = hide_ack(&session.dismiss(Some(completion()))).unwrap();

        let effects = run(session.acknowledged(ack, Err(RenderError::Failed("gone".into()))));
        assert!(hide_ack(&effects).is_none());
        assert_eq!(session.phase(), Phase::Hidden);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_visible_show_with_grace_keeps_overlay_until_grace_ends() {
        let mut session = Session::new();
        session.show(Content::loading(Some("one")), config(0.0), None);

        let effects = session.show(Content::loading(Some("two")), config(0.3), None);
        assert_eq!(session.phase(), Phase::GracePending);
        assert!(session.is_visible());
        let (token, _) = armed(&effects, TimerKind::Grace).unwrap();

        let effects = session.timer_fired(TimerKind::Grace, token);
        assert!(matches!(effects[0], Effect::UpdateContent { .. }));

        // still on screen, so dismissing during a later grace must hide it
        session.show(Content::loading(Some("three")), config(0.3), None);
        assert!(hide_ack(&session.dismiss(None)).is_some());
        assert_eq!(session.phase(), Phase::Dismissing);
    }

    fn sample(kind: u8, n: usize) -> Content {
        let message = format!("step {}", n);
        match kind {
            0 => Content::loading(Some(&message)),
            1 => Content::glyph(IconType::Warning, Some(&message)),
            2 => Content::image(crate::content::Image::new(vec![0u8; 4]), Some(&message)),
            _ => Content::text(&message),
        }
    }

    fn outstanding(effects: &[Effect], acks: &mut Vec<AckId>) {
        acks.extend(effects.iter().filter_map(|e| match e {
            Effect::Present { ack, .. } | Effect::UpdateContent { ack, .. } | Effect::Hide { ack } => {
                Some(*ack)
            }
            _ => None,
        }));
    }

    fn ack_all(session: &mut Session, acks: &mut Vec<AckId>) {
        while !acks.is_empty() {
            for ack in std::mem::take(acks) {
                let effects = run(session.acknowledged(ack, Ok(())));
                outstanding(&effects, acks);
            }
        }
    }

    proptest! {
        #[test]
        fn test_last_show_wins_over_any_sequence(
            ops in prop::collection::vec((0u8..4, any::<bool>(), 0u8..4), 0..30),
            last in (0u8..4, any::<bool>()),
        ) {
            let mut session = Session::new();
            let mut acks = Vec::new();

            for (n, (kind, grace, then)) in ops.into_iter().enumerate() {
                let grace = if grace { 0.5 } else { 0.0 };
                let effects = run(session.show(sample(kind, n), config(grace), None));
                outstanding(&effects, &mut acks);

                // interleave renderer acks, grace fires and dismisses
                match then {
                    1 => ack_all(&mut session, &mut acks),
                    2 => {
                        if let Some(token) = session.timer(TimerKind::Grace) {
                            let effects = run(session.timer_fired(TimerKind::Grace, token));
                            outstanding(&effects, &mut acks);
                        }
                    }
                    3 => {
                        let effects = run(session.dismiss(None));
                        outstanding(&effects, &mut acks);
                    }
                    _ => {}
                }
            }

            let (kind, grace) = last;
            let expected = sample(kind, usize::MAX);
            let effects = run(session.show(expected.clone(), config(if grace { 0.5 } else { 0.0 }), None));
            outstanding(&effects, &mut acks);
            ack_all(&mut session, &mut acks);

            let phase = if grace { Phase::GracePending } else { Phase::Visible };
            prop_assert_eq!(session.phase(), phase);
            prop_assert_eq!(session.content(), Some(&expected));
        }
    }
}
