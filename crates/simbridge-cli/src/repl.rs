//! Console – line-oriented operator input for the running bridge.
//!
//! Plain lines are command tokens and go straight onto the command channel
//! (`throttle_1.0`, `steer_-0.2`, `cruise_down`, `quit`, …).  Lines starting
//! with `/` are handled locally:
//!   /help                     – show this list
//!   /status                   – print the latest vehicle state
//!   /feedback <accel> <angle> – set the autonomy setpoints by hand
//!   /quit | /exit             – stop the bridge and leave the console

use colored::Colorize;
use simbridge_middleware::{CommandSender, LatestReader, LatestWriter};
use simbridge_types::{AutonomyFeedback, VehicleState};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Whether the console keeps reading after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Handles the console talks to.
pub struct Console {
    pub commands: CommandSender,
    pub feedback: Arc<LatestWriter<AutonomyFeedback>>,
    pub state: LatestReader<VehicleState>,
    pub cancel: CancellationToken,
}

/// Read stdin until EOF, `/quit` or cancellation.
pub fn run(console: Console) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if console.cancel.is_cancelled() {
            break;
        }

        print!("{} ", "simbridge>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        if console.handle_line(&line) == Flow::Exit {
            break;
        }
    }
}

impl Console {
    /// Act on one input line.
    pub fn handle_line(&self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }
        let Some(slash) = line.strip_prefix('/') else {
            self.push(line);
            return Flow::Continue;
        };

        let mut words = slash.split_whitespace();
        match words.next().unwrap_or_default() {
            "help" => cmd_help(),
            "status" => self.cmd_status(),
            "feedback" => self.cmd_feedback(words.collect()),
            "quit" | "exit" => {
                self.push("quit");
                println!("{}", "Stopping bridge.".green());
                return Flow::Exit;
            }
            other => println!(
                "{} '/{}'. Type {} for available commands.",
                "Unknown command:".red(),
                other.yellow(),
                "/help".bold()
            ),
        }
        Flow::Continue
    }

    fn push(&self, token: &str) {
        if let Err(e) = self.commands.push(token) {
            println!("{}: {}", "Bridge not accepting commands".red(), e);
        }
    }

    fn cmd_status(&self) {
        let s = self.state.snapshot();
        println!("{}", "Vehicle state".bold().underline());
        println!("  engaged  : {}", if s.autonomy_engaged { "yes".green() } else { "no".yellow() });
        println!("  speed    : {:.2} m/s", s.speed);
        println!("  bearing  : {:.1}°", s.bearing_deg);
        println!("  throttle : {:.3}", s.throttle);
        println!("  brake    : {:.3}", s.brake);
        println!("  steer    : {:.3}", s.steering_angle);
        println!("  button   : {:?}", s.cruise_button);
    }

    fn cmd_feedback(&self, args: Vec<&str>) {
        match parse_feedback(&args) {
            Some(fb) => {
                self.feedback.publish(fb);
                println!(
                    "  {} accel={} angle={}",
                    "✓".green().bold(),
                    fb.accel,
                    fb.steering_angle_deg
                );
            }
            None => println!(
                "{} {}",
                "Usage:".red(),
                "/feedback <accel m/s²> <steering angle °>".bold()
            ),
        }
    }
}

fn parse_feedback(args: &[&str]) -> Option<AutonomyFeedback> {
    let [accel, angle] = args else {
        return None;
    };
    let accel: f32 = accel.parse().ok()?;
    let angle: f32 = angle.parse().ok()?;
    (accel.is_finite() && angle.is_finite()).then(|| AutonomyFeedback::new(accel, angle))
}

fn cmd_help() {
    println!();
    println!("{}", "Bridge Commands".bold().underline());
    println!("  {}  – e.g. throttle_1.0, brake_0.5, steer_-0.1", "<verb>_<arg>".bold().cyan());
    println!("  {}   – cruise_up, cruise_down, cruise_cancel, reverse, quit", "tokens".bold().cyan());
    println!("  {}        – print the latest vehicle state", "/status".bold().cyan());
    println!("  {} – set the autonomy setpoints", "/feedback <a> <θ>".bold().cyan());
    println!("  {}   – stop the bridge", "/quit  /exit".bold().cyan());
    println!();
}
