//! Stand-in for the GPIO header when running away from the phone.
//!
//! Reads one command per line from stdin and turns it into the same edges the
//! real inputs would produce:
//!
//! |Command                       |Effect                                          |
//! |:-----------------------------|:-----------------------------------------------|
//! |`lift`                        |Handset off the hook                            |
//! |`hangup`                      |Handset back on the hook                        |
//! |`dial <digits>`               |Turns the dial once per digit                   |
//! |`reset`                       |Presses and releases the reset button           |
//! |`edge <line> <rising/falling>`|Raw edge on `pulse`, `active`, `hook` or `reset`|
//! |`status`                      |Prints the session status                       |
//! |`quit`                        |Shuts down                                      |

use std::io::{self, BufRead};
use std::sync::mpsc;
use std::thread;
use log::{info, warn};
use thiserror::Error;
use crate::engine::StatusBoard;
use crate::phone::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{0}' is not a dial digit")]
    BadDigit(char),
    #[error("unknown input line '{0}'")]
    BadLine(String),
    #[error("unknown edge '{0}'; expected 'rising' or 'falling'")]
    BadEdge(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Events(Vec<LineEvent>),
    Status,
}

/// Edges produced by turning the dial for one digit.
fn dial_events(digit: char) -> Result<Vec<LineEvent>, CommandError> {
    let value = digit.to_digit(10).ok_or(CommandError::BadDigit(digit))? as usize;
    let pulses = if value == 0 { 10 } else { value };
    let mut events = Vec::with_capacity(pulses * 2 + 2);
    events.push(LineEvent::Edge(InputLine::DialActive, Edge::Falling));
    for _ in 0..pulses {
        events.push(LineEvent::Edge(InputLine::DialPulse, Edge::Rising));
        events.push(LineEvent::Edge(InputLine::DialPulse, Edge::Falling));
    }
    events.push(LineEvent::Edge(InputLine::DialActive, Edge::Rising));
    Ok(events)
}

fn parse_line_name(name: &str) -> Result<InputLine, CommandError> {
    match name {
        "pulse" => Ok(InputLine::DialPulse),
        "active" => Ok(InputLine::DialActive),
        "hook" => Ok(InputLine::Hook),
        "reset" => Ok(InputLine::Reset),
        other => Err(CommandError::BadLine(other.to_owned()))
    }
}

fn parse_edge(name: &str) -> Result<Edge, CommandError> {
    match name {
        "rising" | "r" => Ok(Edge::Rising),
        "falling" | "f" => Ok(Edge::Falling),
        other => Err(CommandError::BadEdge(other.to_owned()))
    }
}

pub fn parse_command(input: &str) -> Result<Command, CommandError> {
    let mut words = input.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Command::Events(vec![]))
    };

    let events = match verb.to_ascii_lowercase().as_str() {
        "lift" => vec![LineEvent::Edge(InputLine::Hook, Edge::Falling)],
        "hangup" => vec![LineEvent::Edge(InputLine::Hook, Edge::Rising)],
        "reset" => vec![
            LineEvent::Edge(InputLine::Reset, Edge::Falling),
            LineEvent::Edge(InputLine::Reset, Edge::Rising),
        ],
        "dial" => {
            let digits: String = words.collect();
            if digits.is_empty() {
                return Err(CommandError::Usage("dial <digits>"))
            }
            let mut events = vec![];
            for digit in digits.chars() {
                events.extend(dial_events(digit)?);
            }
            events
        },
        "edge" => {
            let (Some(line), Some(edge)) = (words.next(), words.next()) else {
                return Err(CommandError::Usage("edge <pulse|active|hook|reset> <rising|falling>"))
            };
            vec![LineEvent::Edge(parse_line_name(line)?, parse_edge(edge)?)]
        },
        "status" => return Ok(Command::Status),
        "quit" | "exit" => vec![LineEvent::Shutdown],
        other => return Err(CommandError::Unknown(other.to_owned()))
    };

    Ok(Command::Events(events))
}

/// Starts reading commands from stdin on a background thread.
pub fn spawn(tx: mpsc::Sender<LineEvent>, status: StatusBoard) {
    let spawned = thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            info!("Console input ready (lift, hangup, dial <digits>, reset, status, quit).");
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Ok(Command::Events(events)) => {
                        for event in events {
                            if tx.send(event).is_err() {
                                return
                            }
                        }
                    },
                    Ok(Command::Status) => info!("{}", status.snapshot()),
                    Err(err) => warn!("{}", err)
                }
            }
            info!("Console input closed.");
        });

    if let Err(err) = spawned {
        warn!("Unable to start console input: {}", err);
    }
}
