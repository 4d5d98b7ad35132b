use chrono::Local;
use tokio::sync::mpsc::UnboundedSender;

use crate::api::admin::Appointment;
use crate::app::AppEvent;
use crate::state_machine::SessionStatus;
use crate::store::{slot_label, Message, MessageKind, Role};

/// One parsed line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the agent.
    Say(String),
    /// Choose slot N from the latest offer (1-based).
    Pick(usize),
    /// Toggle voice capture.
    Mic,
    /// Discard an in-progress capture.
    MicCancel,
    /// Open the appointment monitor.
    Admin,
    /// Close the appointment monitor.
    Close,
    /// Cancel an appointment by id (asks for confirmation).
    Cancel(String),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }

        if let Some(rest) = line.strip_prefix('/') {
            let mut parts = rest.split_whitespace();
            return match parts.next().unwrap_or("") {
                "mic" => match parts.next() {
                    None => Command::Mic,
                    Some("cancel") | Some("stop") => Command::MicCancel,
                    Some(_) => Command::Unknown(rest.to_string()),
                },
                "pick" => match parts.next().and_then(|n| n.parse().ok()) {
                    Some(n) => Command::Pick(n),
                    None => Command::Unknown(rest.to_string()),
                },
                "admin" => Command::Admin,
                "close" => Command::Close,
                "cancel" => match parts.next() {
                    Some(id) => Command::Cancel(id.to_string()),
                    None => Command::Unknown(rest.to_string()),
                },
                "help" => Command::Help,
                "quit" | "exit" => Command::Quit,
                other => Command::Unknown(other.to_string()),
            };
        }

        // A bare small number picks a slot from the latest offer.
        if line.len() <= 2 {
            if let Ok(n) = line.parse::<usize>() {
                return Command::Pick(n);
            }
        }

        Command::Say(line.to_string())
    }
}

pub fn render_message(message: &Message) {
    match message.role {
        Role::User => println!("  you › {}", message.text),
        Role::Agent => match &message.kind {
            MessageKind::Plain => println!(" aura › {}", message.text),
            MessageKind::SlotOptions(slots) => {
                println!(" aura › {}", message.text);
                for (i, slot) in slots.iter().enumerate() {
                    println!("        [{}] {}", i + 1, slot_label(*slot));
                }
                if !slots.is_empty() {
                    println!("        (pick one with /pick <n> or just the number)");
                }
            }
            MessageKind::Confirmation => {
                println!("        ══ BOOKING CONFIRMED ══");
                println!(" aura › {}", message.text);
            }
        },
    }
}

pub fn render_status(status: SessionStatus) {
    match status {
        SessionStatus::Thinking => println!("        … thinking"),
        SessionStatus::Listening => {
            println!("        ● listening — speak, then /mic to send, /mic cancel to discard")
        }
        SessionStatus::Success => println!("        ✓ booked"),
        SessionStatus::Idle => {}
    }
}

pub fn render_admin_table(appointments: &[Appointment]) {
    println!("── appointments ──────────────────────────────────────────────");
    if appointments.is_empty() {
        println!("  (none yet)");
        return;
    }
    println!(
        "  {:<12} {:<16} {:<24} {:<18} {}",
        "id", "client", "service", "time", "status"
    );
    for appt in appointments {
        println!(
            "  {:<12} {:<16} {:<24} {:<18} {}",
            appt.id,
            appt.name,
            appt.service,
            appt.start
                .with_timezone(&Local)
                .format("%b %e %I:%M %p")
                .to_string(),
            appt.status.as_str()
        );
    }
}

pub fn render_help() {
    println!("Type a message and press Enter to talk to the booking agent.");
    println!("  /mic          start voice capture (again to send, '/mic cancel' to discard)");
    println!("  /pick <n>     choose an offered time slot");
    println!("  /admin        open the appointment monitor");
    println!("  /cancel <id>  cancel an appointment (asks for confirmation)");
    println!("  /close        close the appointment monitor");
    println!("  /quit         exit");
}

/// Feed stdin lines into the event loop from a plain blocking thread.
pub fn spawn_input_thread(events: UnboundedSender<AppEvent>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) => {
                    let _ = events.send(AppEvent::Quit);
                    break;
                }
                Ok(_) => {
                    if events.send(AppEvent::Line(line.clone())).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("stdin read failed: {}", e);
                    let _ = events.send(AppEvent::Quit);
                    break;
                }
            }
        }
    });
}
