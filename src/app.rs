use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::api::admin::{AdminClient, Appointment, AppointmentStatus};
use crate::api::dialogue::{AgentReply, DialogueClient, HistoryEntry, ReplyKind};
use crate::api::TransportError;
use crate::audio::VoiceIo;
use crate::state_machine::{SessionState, SessionStatus};
use crate::store::{slot_command, Message, MessageKind, MessageStore, Role};
use crate::ui::{self, Command};

/// Fixed session identifier — one conversation per running instance.
pub const SESSION_ID: &str = "space-user";

const GREETING: &str = "Systems Online. Welcome to the Universal Booking Interface.";

/// Shown in place of a reply when the dialogue endpoint fails.
const FALLBACK_TEXT: &str = "Signal Lost. Please retry.";

/// Pause between receiving a reply and revealing it.
const REPLY_REVEAL: Duration = Duration::from_millis(800);

/// How long a confirmation holds `Success` before reverting to `Idle`.
const SUCCESS_HOLD: Duration = Duration::from_millis(3000);

/// Appointment list refresh cadence while the monitor is open.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Events delivered to the controller loop. Everything that resumes after a
/// suspension point arrives here tagged with the turn / epoch / generation
/// it was armed under, and is dropped if the world moved on.
#[derive(Debug)]
pub enum AppEvent {
    Line(String),
    Transcript(Option<String>),
    Reply {
        turn: u64,
        result: Result<AgentReply, TransportError>,
    },
    SuccessTimeout {
        epoch: u64,
    },
    Appointments {
        generation: u64,
        result: Result<Vec<Appointment>, TransportError>,
    },
    CancelDone {
        generation: u64,
        id: String,
        result: Result<(), TransportError>,
    },
    Quit,
}

/// Why a submission was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    /// Empty after trimming; ignored without comment.
    Empty,
    /// A turn is already in flight; dropped, never interleaved.
    Busy,
}

/// Appointment monitor state while open: the mirrored list plus the poll
/// task feeding it.
struct AdminPanel {
    generation: u64,
    appointments: Vec<Appointment>,
    loaded: bool,
    poll_task: tokio::task::JoinHandle<()>,
}

pub struct App {
    store: MessageStore,
    session: SessionState,
    dialogue: DialogueClient,
    admin_client: AdminClient,
    voice: Box<dyn VoiceIo>,
    events: UnboundedSender<AppEvent>,
    /// Turn id of the outstanding dialogue request, if any.
    in_flight: Option<u64>,
    turn_counter: u64,
    admin: Option<AdminPanel>,
    admin_generation: u64,
    /// Appointment id awaiting y/N confirmation before cancelling.
    pending_cancel: Option<String>,
    running: bool,
}

impl App {
    pub fn new(
        dialogue: DialogueClient,
        admin_client: AdminClient,
        voice: Box<dyn VoiceIo>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        let mut store = MessageStore::default();
        let view = store.append(Message::agent(GREETING));
        ui::render_message(view.last().unwrap());

        Self {
            store,
            session: SessionState::new(),
            dialogue,
            admin_client,
            voice,
            events,
            in_flight: None,
            turn_counter: 0,
            admin: None,
            admin_generation: 0,
            pending_cancel: None,
            running: true,
        }
    }

    pub async fn run(mut self, mut events: UnboundedReceiver<AppEvent>) {
        while self.running {
            let Some(event) = events.recv().await else {
                break;
            };
            self.handle_event(event);
        }
        if let Some(panel) = self.admin.take() {
            panel.poll_task.abort();
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Line(line) => self.handle_line(&line),
            AppEvent::Transcript(text) => self.handle_transcript(text),
            AppEvent::Reply { turn, result } => self.handle_reply(turn, result),
            AppEvent::SuccessTimeout { epoch } => {
                self.session.revert_success(epoch);
            }
            AppEvent::Appointments { generation, result } => {
                self.handle_appointments(generation, result)
            }
            AppEvent::CancelDone {
                generation,
                id,
                result,
            } => self.handle_cancel_done(generation, id, result),
            AppEvent::Quit => self.running = false,
        }
    }

    fn handle_line(&mut self, line: &str) {
        // A pending cancel confirmation swallows the next line.
        if let Some(id) = self.pending_cancel.take() {
            let answer = line.trim().to_lowercase();
            if answer == "y" || answer == "yes" {
                self.dispatch_cancel(id);
            } else {
                println!("Kept appointment {}.", id);
            }
            return;
        }

        match Command::parse(line) {
            Command::Empty => {}
            Command::Say(text) => self.try_submit(&text),
            Command::Pick(n) => self.pick_slot(n),
            Command::Mic => self.toggle_mic(),
            Command::MicCancel => self.cancel_mic(),
            Command::Admin => self.open_admin(),
            Command::Close => self.close_admin(),
            Command::Cancel(id) => self.request_cancel(id),
            Command::Help => ui::render_help(),
            Command::Quit => self.running = false,
            Command::Unknown(cmd) => println!("Unknown command /{} — try /help.", cmd),
        }
    }

    // ── Conversation ─────────────────────────────────────────────────

    fn try_submit(&mut self, text: &str) {
        match self.submit(text) {
            Ok(()) | Err(SubmitRejected::Empty) => {}
            Err(SubmitRejected::Busy) => {
                log::warn!("Submission dropped — a turn is already in flight");
                println!("        (still thinking — one moment)");
            }
        }
    }

    /// Accept one user turn: record it, then dispatch it to the agent. At
    /// most one turn may be in flight; later attempts are dropped here.
    fn submit(&mut self, raw: &str) -> Result<(), SubmitRejected> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(SubmitRejected::Empty);
        }
        if self.session.status() == SessionStatus::Thinking || self.in_flight.is_some() {
            return Err(SubmitRejected::Busy);
        }

        // History is what the agent had seen before this turn.
        let history = wire_history(self.store.messages());

        let view = self.store.append(Message::user(text));
        ui::render_message(view.last().unwrap());

        self.session.begin_thinking();
        ui::render_status(self.session.status());

        self.turn_counter += 1;
        let turn = self.turn_counter;
        self.in_flight = Some(turn);
        log::debug!("Turn {} dispatched (epoch {})", turn, self.session.epoch());

        let client = self.dialogue.clone();
        let events = self.events.clone();
        let message = text.to_string();
        tokio::spawn(async move {
            let result = client.send(SESSION_ID, &message, &history).await;
            if result.is_ok() {
                // Brief reveal pause; failures surface immediately.
                tokio::time::sleep(REPLY_REVEAL).await;
            }
            let _ = events.send(AppEvent::Reply { turn, result });
        });

        Ok(())
    }

    fn handle_reply(&mut self, turn: u64, result: Result<AgentReply, TransportError>) {
        if self.in_flight != Some(turn) {
            log::debug!("Reply for turn {} dropped — no longer current", turn);
            return;
        }
        self.in_flight = None;

        match result {
            Ok(reply) => {
                let spoken = reply.text.clone();
                let kind = match reply.kind {
                    ReplyKind::Plain => MessageKind::Plain,
                    ReplyKind::Slots(slots) => MessageKind::SlotOptions(slots),
                    ReplyKind::Confirmation => MessageKind::Confirmation,
                };
                let confirmed = kind == MessageKind::Confirmation;

                let view = self.store.append(Message {
                    role: Role::Agent,
                    text: reply.text,
                    kind,
                });
                ui::render_message(view.last().unwrap());

                if confirmed {
                    let armed_epoch = self.session.settle_success();
                    ui::render_status(self.session.status());
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(SUCCESS_HOLD).await;
                        let _ = events.send(AppEvent::SuccessTimeout { epoch: armed_epoch });
                    });
                } else {
                    self.session.settle_idle();
                }

                self.voice.speak(&spoken);
            }
            Err(e) => {
                log::error!("Dialogue request failed: {}", e);
                let view = self.store.append(Message::agent(FALLBACK_TEXT));
                ui::render_message(view.last().unwrap());
                self.session.settle_idle();
            }
        }
    }

    fn pick_slot(&mut self, index: usize) {
        let slots = self.store.messages().iter().rev().find_map(|m| match &m.kind {
            MessageKind::SlotOptions(slots) => Some(slots.clone()),
            _ => None,
        });

        let Some(slots) = slots else {
            println!("No open slots to pick from.");
            return;
        };

        match index.checked_sub(1).and_then(|i| slots.get(i)) {
            Some(slot) => self.try_submit(&slot_command(*slot)),
            None => println!("No slot #{} — pick 1..{}.", index, slots.len()),
        }
    }

    // ── Voice ────────────────────────────────────────────────────────

    fn toggle_mic(&mut self) {
        if self.voice.is_capturing() {
            // Finishing: the transcript comes back through the event loop.
            let events = self.events.clone();
            self.voice.finish_capture(Arc::new(move |transcript| {
                let _ = events.send(AppEvent::Transcript(transcript));
            }));
            return;
        }

        if !self.voice.capture_available() {
            // Degraded mode, not an error: the mic is simply inert.
            log::info!("Voice capture unavailable — /mic ignored");
            return;
        }

        if !self.session.begin_listening() {
            log::debug!("Mic ignored while {:?}", self.session.status());
            return;
        }

        if self.voice.start_capture() {
            ui::render_status(self.session.status());
        } else {
            self.session.end_listening();
        }
    }

    fn cancel_mic(&mut self) {
        if self.voice.is_capturing() {
            self.voice.cancel_capture();
        }
        self.session.end_listening();
    }

    fn handle_transcript(&mut self, transcript: Option<String>) {
        if self.session.status() != SessionStatus::Listening {
            log::debug!("Transcript arrived outside Listening — dropped");
            return;
        }
        match transcript {
            Some(text) if !text.trim().is_empty() => self.try_submit(&text),
            _ => {
                println!("        (didn't catch that)");
                self.session.end_listening();
            }
        }
    }

    // ── Appointment monitor ──────────────────────────────────────────

    fn open_admin(&mut self) {
        if self.admin.is_some() {
            println!("The appointment monitor is already open.");
            return;
        }

        self.admin_generation += 1;
        let generation = self.admin_generation;
        let client = self.admin_client.clone();
        let events = self.events.clone();

        // First fetch fires immediately, then every interval.
        let poll_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            loop {
                ticker.tick().await;
                let result = client.appointments().await;
                if events
                    .send(AppEvent::Appointments { generation, result })
                    .is_err()
                {
                    break;
                }
            }
        });

        self.admin = Some(AdminPanel {
            generation,
            appointments: Vec::new(),
            loaded: false,
            poll_task,
        });
        println!("Appointment monitor open — refreshing every 10s. /cancel <id>, /close.");
    }

    fn close_admin(&mut self) {
        match self.admin.take() {
            Some(panel) => {
                panel.poll_task.abort();
                self.pending_cancel = None;
                println!("Appointment monitor closed.");
            }
            None => println!("The appointment monitor is not open."),
        }
    }

    fn handle_appointments(
        &mut self,
        generation: u64,
        result: Result<Vec<Appointment>, TransportError>,
    ) {
        let Some(panel) = self.admin.as_mut() else {
            log::debug!("Appointment refresh after close — discarded");
            return;
        };
        if panel.generation != generation {
            log::debug!("Appointment refresh from stale monitor — discarded");
            return;
        }

        match result {
            Ok(list) => {
                let changed = !panel.loaded || panel.appointments != list;
                panel.appointments = list;
                panel.loaded = true;
                if changed {
                    ui::render_admin_table(&panel.appointments);
                }
            }
            Err(e) => {
                log::warn!("Appointment refresh failed ({}); keeping last known list", e);
            }
        }
    }

    fn request_cancel(&mut self, id: String) {
        let Some(panel) = self.admin.as_ref() else {
            println!("Open the appointment monitor first (/admin).");
            return;
        };

        match panel.appointments.iter().find(|a| a.id == id) {
            None => println!("No appointment with id {}.", id),
            Some(appt) if appt.status != AppointmentStatus::Booked => {
                println!("Appointment {} is already cancelled.", id);
            }
            Some(appt) => {
                println!(
                    "Cancel {} for {} at {}? [y/N]",
                    appt.service,
                    appt.name,
                    appt.start
                        .with_timezone(&chrono::Local)
                        .format("%b %e %I:%M %p")
                );
                self.pending_cancel = Some(id);
            }
        }
    }

    fn dispatch_cancel(&mut self, id: String) {
        let Some(panel) = self.admin.as_ref() else {
            return;
        };
        let generation = panel.generation;
        let client = self.admin_client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.cancel(&id).await;
            let _ = events.send(AppEvent::CancelDone {
                generation,
                id,
                result,
            });
        });
    }

    fn handle_cancel_done(
        &mut self,
        generation: u64,
        id: String,
        result: Result<(), TransportError>,
    ) {
        let Some(panel) = self.admin.as_ref() else {
            return;
        };
        if panel.generation != generation {
            return;
        }

        match result {
            Ok(()) => {
                log::info!("Appointment {} cancelled", id);
                // Resync right away instead of waiting out the interval.
                let client = self.admin_client.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let result = client.appointments().await;
                    let _ = events.send(AppEvent::Appointments { generation, result });
                });
            }
            Err(e) => {
                log::error!("Cancel failed for {}: {}", id, e);
                println!("!! Could not cancel {} — the service refused or was unreachable.", id);
            }
        }
    }
}

/// Translate the stored log into the agent protocol; agent turns travel as
/// `assistant`.
fn wire_history(messages: &[Message]) -> Vec<HistoryEntry> {
    messages
        .iter()
        .map(|m| HistoryEntry {
            role: match m.role {
                Role::User => "user",
                Role::Agent => "assistant",
            },
            content: m.text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NoopVoice;
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(
            DialogueClient::new("http://127.0.0.1:9".to_string()),
            AdminClient::new("http://127.0.0.1:9".to_string()),
            Box::new(NoopVoice),
            tx,
        );
        (app, rx)
    }

    fn plain_reply(text: &str) -> AgentReply {
        AgentReply {
            text: text.to_string(),
            kind: ReplyKind::Plain,
        }
    }

    fn appointment(id: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.to_string(),
            name: "Dana".to_string(),
            contact: "dana@example.com".to_string(),
            service: "Glow Consultation".to_string(),
            start: Utc.with_ymd_and_hms(2026, 8, 7, 14, 30, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 8, 7, 15, 0, 0).unwrap(),
            status,
        }
    }

    #[tokio::test]
    async fn test_submit_appends_user_message_then_thinks() {
        let (mut app, _rx) = test_app();
        app.submit("I need a haircut tomorrow").unwrap();

        assert_eq!(app.store.messages().len(), 2); // greeting + user turn
        let last = app.store.messages().last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.kind, MessageKind::Plain);
        assert_eq!(app.session.status(), SessionStatus::Thinking);
        assert_eq!(app.in_flight, Some(1));
    }

    #[tokio::test]
    async fn test_empty_submission_rejected_silently() {
        let (mut app, _rx) = test_app();
        assert_eq!(app.submit("   \n"), Err(SubmitRejected::Empty));
        assert_eq!(app.store.messages().len(), 1);
        assert_eq!(app.session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_second_submission_while_thinking_is_dropped() {
        let (mut app, _rx) = test_app();
        app.submit("first").unwrap();
        assert_eq!(app.submit("second"), Err(SubmitRejected::Busy));

        // nothing appended, nothing re-dispatched
        assert_eq!(app.store.messages().len(), 2);
        assert_eq!(app.in_flight, Some(1));
    }

    #[tokio::test]
    async fn test_successful_turns_grow_store_by_two_each() {
        let (mut app, _rx) = test_app();

        for i in 0..3 {
            app.submit(&format!("turn {}", i)).unwrap();
            let turn = app.in_flight.unwrap();
            app.handle_reply(turn, Ok(plain_reply("sure")));
        }

        // greeting + 3 * (user + agent), strictly alternating
        assert_eq!(app.store.messages().len(), 7);
        for pair in app.store.messages()[1..].chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Agent);
        }
        assert_eq!(app.session.status(), SessionStatus::Idle);
        assert_eq!(app.in_flight, None);
    }

    #[tokio::test]
    async fn test_failed_turn_appends_fallback_and_settles_idle() {
        let (mut app, _rx) = test_app();
        app.submit("hello?").unwrap();
        let turn = app.in_flight.unwrap();
        app.handle_reply(turn, Err(TransportError::Decode("garbage".to_string())));

        assert_eq!(app.store.messages().len(), 3); // greeting + user + fallback
        let last = app.store.messages().last().unwrap();
        assert_eq!(last.role, Role::Agent);
        assert_eq!(last.text, FALLBACK_TEXT);
        assert_eq!(last.kind, MessageKind::Plain);
        assert_eq!(app.session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_stale_reply_is_discarded() {
        let (mut app, _rx) = test_app();
        app.submit("hi").unwrap();
        let before = app.store.messages().len();

        app.handle_reply(999, Ok(plain_reply("from nowhere")));
        assert_eq!(app.store.messages().len(), before);
        assert_eq!(app.session.status(), SessionStatus::Thinking);
    }

    #[tokio::test]
    async fn test_confirmation_holds_success_then_reverts() {
        let (mut app, _rx) = test_app();
        app.submit("book it").unwrap();
        let turn = app.in_flight.unwrap();
        app.handle_reply(
            turn,
            Ok(AgentReply {
                text: "Booked!".to_string(),
                kind: ReplyKind::Confirmation,
            }),
        );
        assert_eq!(app.session.status(), SessionStatus::Success);

        let armed = app.session.epoch();
        app.handle_event(AppEvent::SuccessTimeout { epoch: armed });
        assert_eq!(app.session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_new_submission_preempts_pending_revert() {
        let (mut app, _rx) = test_app();
        app.submit("book it").unwrap();
        let turn = app.in_flight.unwrap();
        app.handle_reply(
            turn,
            Ok(AgentReply {
                text: "Booked!".to_string(),
                kind: ReplyKind::Confirmation,
            }),
        );
        let armed = app.session.epoch();

        app.submit("one more thing").unwrap();
        assert_eq!(app.session.status(), SessionStatus::Thinking);

        // the old timer lands late and must not flip Thinking back to Idle
        app.handle_event(AppEvent::SuccessTimeout { epoch: armed });
        assert_eq!(app.session.status(), SessionStatus::Thinking);
    }

    #[tokio::test]
    async fn test_slot_pick_submits_book_command() {
        let (mut app, _rx) = test_app();
        app.submit("what's open?").unwrap();
        let turn = app.in_flight.unwrap();

        let slots = vec![
            Utc.with_ymd_and_hms(2026, 8, 7, 14, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 8, 7, 15, 0, 0).unwrap(),
        ];
        app.handle_reply(
            turn,
            Ok(AgentReply {
                text: "Open times:".to_string(),
                kind: ReplyKind::Slots(slots.clone()),
            }),
        );

        app.pick_slot(2);
        let last = app.store.messages().last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.text, slot_command(slots[1]));
        assert_eq!(app.session.status(), SessionStatus::Thinking);
    }

    #[tokio::test]
    async fn test_out_of_range_pick_submits_nothing() {
        let (mut app, _rx) = test_app();
        app.submit("what's open?").unwrap();
        let turn = app.in_flight.unwrap();
        app.handle_reply(
            turn,
            Ok(AgentReply {
                text: "Open times:".to_string(),
                kind: ReplyKind::Slots(vec![Utc.with_ymd_and_hms(2026, 8, 7, 14, 30, 0).unwrap()]),
            }),
        );

        let before = app.store.messages().len();
        app.pick_slot(5);
        app.pick_slot(0);
        assert_eq!(app.store.messages().len(), before);
    }

    #[tokio::test]
    async fn test_transcript_outside_listening_is_dropped() {
        let (mut app, _rx) = test_app();
        let before = app.store.messages().len();
        app.handle_transcript(Some("late transcript".to_string()));
        assert_eq!(app.store.messages().len(), before);
        assert_eq!(app.session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_mic_is_inert_without_capture_capability() {
        let (mut app, _rx) = test_app();
        app.toggle_mic();
        assert_eq!(app.session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_refresh_replaces_list_idempotently() {
        let (mut app, _rx) = test_app();
        app.open_admin();
        let generation = app.admin.as_ref().unwrap().generation;

        let list = vec![
            appointment("a1", AppointmentStatus::Booked),
            appointment("a2", AppointmentStatus::Cancelled),
        ];
        app.handle_appointments(generation, Ok(list.clone()));
        assert_eq!(app.admin.as_ref().unwrap().appointments, list);

        app.handle_appointments(generation, Ok(list.clone()));
        assert_eq!(app.admin.as_ref().unwrap().appointments, list);
        assert_eq!(app.admin.as_ref().unwrap().appointments.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_list() {
        let (mut app, _rx) = test_app();
        app.open_admin();
        let generation = app.admin.as_ref().unwrap().generation;

        let list = vec![appointment("a1", AppointmentStatus::Booked)];
        app.handle_appointments(generation, Ok(list.clone()));
        app.handle_appointments(
            generation,
            Err(TransportError::Decode("boom".to_string())),
        );
        assert_eq!(app.admin.as_ref().unwrap().appointments, list);
    }

    #[tokio::test]
    async fn test_stale_generation_refresh_is_discarded() {
        let (mut app, _rx) = test_app();
        app.open_admin();
        app.close_admin();
        app.open_admin();
        let generation = app.admin.as_ref().unwrap().generation;

        app.handle_appointments(
            generation - 1,
            Ok(vec![appointment("ghost", AppointmentStatus::Booked)]),
        );
        assert!(app.admin.as_ref().unwrap().appointments.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_after_close_is_discarded() {
        let (mut app, _rx) = test_app();
        app.open_admin();
        let generation = app.admin.as_ref().unwrap().generation;
        app.close_admin();

        app.handle_appointments(
            generation,
            Ok(vec![appointment("ghost", AppointmentStatus::Booked)]),
        );
        assert!(app.admin.is_none());
    }

    #[tokio::test]
    async fn test_cancel_requires_confirmation() {
        let (mut app, _rx) = test_app();
        app.open_admin();
        let generation = app.admin.as_ref().unwrap().generation;
        app.handle_appointments(
            generation,
            Ok(vec![appointment("a1", AppointmentStatus::Booked)]),
        );

        app.request_cancel("a1".to_string());
        assert_eq!(app.pending_cancel.as_deref(), Some("a1"));

        // declined: nothing is dispatched, the prompt is consumed
        app.handle_line("n");
        assert_eq!(app.pending_cancel, None);
    }

    #[tokio::test]
    async fn test_cancel_refused_for_cancelled_rows() {
        let (mut app, _rx) = test_app();
        app.open_admin();
        let generation = app.admin.as_ref().unwrap().generation;
        app.handle_appointments(
            generation,
            Ok(vec![appointment("a1", AppointmentStatus::Cancelled)]),
        );

        app.request_cancel("a1".to_string());
        assert_eq!(app.pending_cancel, None);
    }

    #[tokio::test]
    async fn test_failed_cancel_leaves_list_untouched() {
        let (mut app, _rx) = test_app();
        app.open_admin();
        let generation = app.admin.as_ref().unwrap().generation;
        let list = vec![appointment("a1", AppointmentStatus::Booked)];
        app.handle_appointments(generation, Ok(list.clone()));

        app.handle_cancel_done(
            generation,
            "a1".to_string(),
            Err(TransportError::Decode("refused".to_string())),
        );
        assert_eq!(app.admin.as_ref().unwrap().appointments, list);
    }

    #[tokio::test]
    async fn test_history_excludes_current_turn_and_maps_roles() {
        let (mut app, _rx) = test_app();
        app.submit("hi").unwrap();
        let turn = app.in_flight.unwrap();
        app.handle_reply(turn, Ok(plain_reply("hello!")));

        // what the next submission would send: greeting + user + agent
        let history = wire_history(app.store.messages());
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, "assistant");
        assert_eq!(history[1].role, "user");
        assert_eq!(history[2].role, "assistant");
        assert_eq!(history[2].content, "hello!");
    }
}
