use std::io::BufRead;

use rust_decimal::Decimal;

use crate::lots::{AllocationSession, DialogResult, LotAllocationStrategy, LotAllocationUi};
use crate::util::basic::SError;
use crate::util::rw::WriteHandle;
use crate::util::sys::is_affirmative;
use crate::{write_err, write_errln};

use super::outfmt::model::{LotWriter, OutputType};
use super::outfmt::text::TextWriter;
use super::render::render_allocation_session;

const PROMPT: &str = "Command (? for help): ";

const HELP: &str = "\
  f              allocate first-in
  l              allocate last-in
  p              allocate lowest price first
  h              allocate highest price first
  s <row> <n>    set the sale shares of a row
  d              discard all allocated shares
  w              save and close
  q              cancel";

#[derive(PartialEq, Debug)]
enum Command {
    Allocate(LotAllocationStrategy),
    SetShares { row: usize, shares: Decimal },
    Discard,
    Save,
    Cancel,
    Help,
    Redraw,
}

fn parse_command(line: &str) -> Result<Command, SError> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(Command::Redraw);
    };
    let cmd = match cmd {
        "f" => Command::Allocate(LotAllocationStrategy::FirstIn),
        "l" => Command::Allocate(LotAllocationStrategy::LastIn),
        "p" => Command::Allocate(LotAllocationStrategy::LowestPrice),
        "h" => Command::Allocate(LotAllocationStrategy::HighestPrice),
        "s" => {
            let (Some(row), Some(shares)) = (words.next(), words.next()) else {
                return Err("Usage: s <row> <shares>".to_string());
            };
            let row = match row.parse::<usize>() {
                Ok(r) if r > 0 => r,
                _ => return Err(format!("Invalid row \"{}\"", row)),
            };
            let shares = shares
                .parse::<Decimal>()
                .map_err(|_| format!("Invalid share count \"{}\"", shares))?;
            Command::SetShares { row, shares }
        }
        "d" => Command::Discard,
        "w" => Command::Save,
        "q" => Command::Cancel,
        "?" => Command::Help,
        _ => return Err(format!("Unknown command \"{}\"", cmd)),
    };
    if words.next().is_some() {
        return Err(format!("Too many arguments in \"{}\"", line.trim()));
    }
    Ok(cmd)
}

/// Allocation dialog on a line-oriented terminal. Reads commands from
/// `input`, and writes the lot table and messages to `out`.
pub struct TerminalAllocationUi<R: BufRead> {
    input: R,
    out: WriteHandle,
    initial_strategy: Option<LotAllocationStrategy>,
}

impl<R: BufRead> TerminalAllocationUi<R> {
    pub fn new(input: R, out: WriteHandle) -> TerminalAllocationUi<R> {
        TerminalAllocationUi { input, out, initial_strategy: None }
    }

    /// Pre-fills each dialog with this strategy's allocation.
    pub fn with_initial_strategy(mut self, strategy: Option<LotAllocationStrategy>) -> Self {
        self.initial_strategy = strategy;
        self
    }

    // None on end of input
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, SError> {
        write_err!(self.out, "{}", prompt);
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .map_err(|e| format!("Failed to read command: {e}"))?;
        if n == 0 {
            write_errln!(self.out, "");
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn show(&mut self, session: &AllocationSession) -> Result<(), SError> {
        let sale = session.sale();
        let name = format!("{} (sold {})", sale.security, sale.date);
        TextWriter::new(self.out.clone()).print_render_table(
            OutputType::Allocation,
            &name,
            &render_allocation_session(session),
        )
    }
}

impl<R: BufRead> LotAllocationUi for TerminalAllocationUi<R> {
    fn show_allocation_dialog(
        &mut self,
        mut session: AllocationSession,
    ) -> Result<DialogResult, SError> {
        if let Some(strategy) = self.initial_strategy {
            session.apply_strategy(strategy);
        }

        let mut redraw = true;
        loop {
            if redraw {
                self.show(&session)?;
            }
            redraw = true;

            let Some(line) = self.read_line(PROMPT)? else {
                return Ok(session.cancel());
            };
            let cmd = match parse_command(&line) {
                Ok(cmd) => cmd,
                Err(e) => {
                    write_errln!(self.out, "{}", e);
                    redraw = false;
                    continue;
                }
            };

            match cmd {
                Command::Allocate(strategy) => {
                    let remaining = session.apply_strategy(strategy);
                    if !remaining.is_zero() {
                        write_errln!(
                            self.out,
                            "Not enough purchase shares: {} left unallocated",
                            remaining.normalize()
                        );
                    }
                }
                Command::SetShares { row, shares } => {
                    if let Err(e) = session.set_lot_shares(row - 1, shares) {
                        write_errln!(self.out, "{}", e);
                        redraw = false;
                    }
                }
                Command::Discard => session.discard_lots(),
                Command::Save => {
                    if session.can_save() {
                        return session.save();
                    }
                    if session.is_changed() {
                        write_errln!(
                            self.out,
                            "Allocate all {} shares, or none, before saving",
                            session.total_shares().normalize()
                        );
                    } else {
                        write_errln!(self.out, "Nothing changed");
                    }
                    redraw = false;
                }
                Command::Cancel => {
                    if session.is_changed() {
                        let answer = self.read_line("Discard changes? [y/N] ")?;
                        if !answer.as_deref().map(is_affirmative).unwrap_or(true) {
                            redraw = false;
                            continue;
                        }
                    }
                    return Ok(session.cancel());
                }
                Command::Help => {
                    write_errln!(self.out, "{}", HELP);
                    redraw = false;
                }
                Command::Redraw => (),
            }
        }
    }
}
