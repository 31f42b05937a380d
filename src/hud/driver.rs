//! HUD driver task
//!
//! The single execution context of one HUD: owns the session, the renderer
//! and both timer deadlines. Requests, renderer acknowledgements and timer
//! fires are all handled inside one `select!` loop, so transitions never
//! interleave.

use super::session::{AckId, Completion, Effect, Phase, Session, TimerKind, TimerToken};
use crate::config::Configuration;
use crate::content::Content;
use crate::renderer::{Ack, AckEvent, RenderError, Renderer, Surface};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

/// How long a renderer may hold a hide acknowledgement before the HUD is
/// reset as if the hide had failed.
pub const HIDE_ACK_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) enum Request {
    Show {
        content: Content,
        config: Configuration,
        completion: Option<Completion>,
    },
    Update(String),
    Dismiss(Option<Completion>),
    Attach(Surface),
    Settle(oneshot::Sender<()>),
}

/// Snapshot published after every transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub phase: Phase,
    /// An overlay is on screen (including while its hide animation runs).
    pub visible: bool,
    pub content: Option<Content>,
}

type Deadline = Option<(TimerToken, Instant)>;

/// `None` when `after` is too far out to represent; such a timer never fires.
fn deadline(after: Duration) -> Option<Instant> {
    Instant::now().checked_add(after)
}

pub(crate) struct Driver<R: Renderer> {
    label: String,
    renderer: R,
    session: Session,
    grace: Deadline,
    auto_dismiss: Deadline,
    /// Outstanding hide and when to stop waiting for it.
    hide_watch: Option<(AckId, Instant)>,
    ack_tx: mpsc::UnboundedSender<AckEvent>,
    status: watch::Sender<Status>,
}

impl<R: Renderer> Driver<R> {
    pub fn new(
        label: String,
        renderer: R,
        ack_tx: mpsc::UnboundedSender<AckEvent>,
        status: watch::Sender<Status>,
    ) -> Self {
        Self {
            label,
            renderer,
            session: Session::new(),
            grace: None,
            auto_dismiss: None,
            hide_watch: None,
            ack_tx,
            status,
        }
    }

    pub async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut acks: mpsc::UnboundedReceiver<AckEvent>,
    ) {
        log::info!("[Hud {}] Driver started", self.label);

        loop {
            tokio::select! {
                biased;

                Some(event) = acks.recv() => self.acknowledge(event),
                _ = sleep_until(self.grace) => self.fire(TimerKind::Grace),
                _ = sleep_until(self.auto_dismiss) => self.fire(TimerKind::AutoDismiss),
                _ = sleep_until(self.hide_watch) => self.hide_timed_out(),
                request = requests.recv() => match request {
                    Some(request) => self.handle(request, &mut acks),
                    None => break,
                },
            }
            self.publish();
        }

        log::info!("[Hud {}] Driver stopped", self.label);
    }

    fn handle(&mut self, request: Request, acks: &mut mpsc::UnboundedReceiver<AckEvent>) {
        let effects = match request {
            Request::Show { content, config, completion } => {
                log::debug!("[Hud {}] show {}", self.label, content.kind());
                self.session.show(content, config, completion)
            }
            Request::Update(message) => self.session.update(&message),
            Request::Dismiss(completion) => {
                log::debug!("[Hud {}] dismiss", self.label);
                self.session.dismiss(completion)
            }
            Request::Attach(surface) => {
                log::info!("[Hud {}] Bound to surface {}", self.label, surface.label());
                self.renderer.attach(&surface);
                Vec::new()
            }
            Request::Settle(reply) => {
                self.settle(acks);
                let _ = reply.send(());
                Vec::new()
            }
        };
        self.apply(effects);
    }

    /// Drain everything that is already due: delivered acks and expired timers.
    fn settle(&mut self, acks: &mut mpsc::UnboundedReceiver<AckEvent>) {
        loop {
            if let Ok(event) = acks.try_recv() {
                self.acknowledge(event);
                continue;
            }
            let now = Instant::now();
            if matches!(self.grace, Some((_, at)) if at <= now) {
                self.fire(TimerKind::Grace);
                continue;
            }
            if matches!(self.auto_dismiss, Some((_, at)) if at <= now) {
                self.fire(TimerKind::AutoDismiss);
                continue;
            }
            if matches!(self.hide_watch, Some((_, at)) if at <= now) {
                self.hide_timed_out();
                continue;
            }
            break;
        }
        self.publish();
    }

    fn acknowledge(&mut self, event: AckEvent) {
        if matches!(self.hide_watch, Some((id, _)) if id == event.id) {
            self.hide_watch = None;
        }
        let effects = self.session.acknowledged(event.id, event.result);
        self.apply(effects);
    }

    fn hide_timed_out(&mut self) {
        if let Some((id, _)) = self.hide_watch.take() {
            log::warn!(
                "[Hud {}] Hide not acknowledged within {:?}",
                self.label,
                HIDE_ACK_TIMEOUT
            );
            let effects = self.session.acknowledged(id, Err(RenderError::TimedOut));
            self.apply(effects);
        }
    }

    fn fire(&mut self, kind: TimerKind) {
        let slot = match kind {
            TimerKind::Grace => self.grace.take(),
            TimerKind::AutoDismiss => self.auto_dismiss.take(),
        };
        if let Some((token, _)) = slot {
            let effects = self.session.timer_fired(kind, token);
            self.apply(effects);
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Present { config, content, ack } => {
                    let ack = Ack::new(ack, self.ack_tx.clone());
                    self.renderer.present(&config, &content, ack);
                }
                Effect::UpdateContent { config, content, ack } => {
                    let ack = Ack::new(ack, self.ack_tx.clone());
                    self.renderer.update_content(&config, &content, ack);
                }
                Effect::Hide { ack: id } => {
                    self.hide_watch = deadline(HIDE_ACK_TIMEOUT).map(|at| (id, at));
                    let ack = Ack::new(id, self.ack_tx.clone());
                    self.renderer.hide(ack);
                }
                Effect::ArmTimer { timer, token, after } => {
                    log::debug!("[Hud {}] {:?} timer armed for {:?}", self.label, timer, after);
                    let at = deadline(after);
                    if at.is_none() {
                        log::warn!("[Hud {}] {:?} timer out of range, never fires", self.label, timer);
                    }
                    *self.slot(timer) = at.map(|at| (token, at));
                }
                Effect::DisarmTimer { timer } => {
                    *self.slot(timer) = None;
                }
                Effect::Complete(completion) => completion(),
            }
        }
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Deadline {
        match kind {
            TimerKind::Grace => &mut self.grace,
            TimerKind::AutoDismiss => &mut self.auto_dismiss,
        }
    }

    fn publish(&self) {
        let next = Status {
            phase: self.session.phase(),
            visible: self.session.is_visible(),
            content: self.session.content().cloned(),
        };
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

async fn sleep_until<T>(deadline: Option<(T, Instant)>) {
    match deadline {
        Some((_, at)) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
