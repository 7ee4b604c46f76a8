use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::app::approot::{run_allocate, run_import, run_lots};
use crate::app::config::Config;
use crate::app::dialog::TerminalAllocationUi;
use crate::app::Error;
use crate::lots::{LotAllocationStrategy, LotAllocationUi, StrategyAllocationUi};
use crate::util::rw::{DescribedReader, WriteHandle};
use crate::write_errln;

const ABOUT: &str = "Reconciles capital gains reports with ledger lots";

fn get_long_about() -> String {
    format!(
        "\
A cli tool which links the sales in a ledger to the purchases they came from
(security lots), using a capital gains report from a brokerage.

Report rows are matched to sales by security and sale date, and to purchases
by purchase date, share count and price. Sales the report does not fully
resolve can be allocated interactively, or with a strategy.

The report is tab-separated, with rows of:
  marker, security, shares, bought (M/d/yy), sold (M/d/yy),
  sales price, cost basis, gain/loss

Defaults for --ledger, --strategy and interactivity can be set in
~/{}/config.json, for example:
  {{\"ledger\": \"/home/me/ledger.json\", \"default_strategy\": \"first-in\",
   \"interactive\": true}}",
        crate::util::os::APP_DIR_NAME
    )
}

#[derive(Parser, Debug)]
#[command(version = crate::app::TAXLOT_APP_VERSION,
          about = ABOUT, long_about = get_long_about())]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Print verbose output
    #[arg(short, long, default_value_t = false, global = true)]
    pub verbose: bool,
}

#[derive(ClapArgs, Debug)]
pub struct LedgerArgs {
    /// Ledger file (JSON). Defaults to the ledger in the config file.
    #[arg(short, long)]
    pub ledger: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a capital gains report, saving the lots it resolves
    Import {
        /// Capital gains report (tab-separated)
        report: PathBuf,

        #[command(flatten)]
        ledger: LedgerArgs,

        /// Allocation strategy for sales the report does not resolve.
        /// Pre-fills the dialog when interactive.
        #[arg(short, long, value_enum)]
        strategy: Option<LotAllocationStrategy>,

        /// Do not prompt. Unresolved sales are allocated with the
        /// strategy, and skipped if that does not cover them.
        #[arg(long, default_value_t = false)]
        non_interactive: bool,

        /// Match and report, but do not write the ledger
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Edit the lots of one sale
    Allocate {
        /// Id of the sale
        sale_id: u64,

        #[command(flatten)]
        ledger: LedgerArgs,

        /// Allocate with this strategy instead of prompting
        #[arg(short, long, value_enum)]
        strategy: Option<LotAllocationStrategy>,
    },
    /// List the lots in the ledger
    Lots {
        #[command(flatten)]
        ledger: LedgerArgs,
    },
}

fn ledger_path(args: &LedgerArgs, config: &Config) -> Result<PathBuf, Error> {
    args.ledger
        .clone()
        .or_else(|| config.ledger.clone())
        .ok_or_else(|| "No ledger file given (use --ledger, or set it in the config)".to_string())
}

fn stdin_ui(strategy: Option<LotAllocationStrategy>) -> Box<dyn LotAllocationUi> {
    Box::new(
        TerminalAllocationUi::new(std::io::stdin().lock(), WriteHandle::stdout_write_handle())
            .with_initial_strategy(strategy),
    )
}

fn run_command(command: Command, config: &Config) -> Result<(), Error> {
    let out = WriteHandle::stdout_write_handle();
    match command {
        Command::Import { report, ledger, strategy, non_interactive, dry_run } => {
            let ledger_path = ledger_path(&ledger, config)?;
            let interactive = !non_interactive && config.is_interactive();
            let mut ui: Box<dyn LotAllocationUi> = if interactive {
                stdin_ui(strategy.or(config.default_strategy))
            } else {
                Box::new(StrategyAllocationUi { strategy: strategy.unwrap_or(config.strategy()) })
            };
            let report = DescribedReader::from_file_path(report);
            run_import(&report, &ledger_path, dry_run, ui.as_mut(), out).map(|_| ())
        }
        Command::Allocate { sale_id, ledger, strategy } => {
            let ledger_path = ledger_path(&ledger, config)?;
            let mut ui: Box<dyn LotAllocationUi> = match strategy {
                Some(strategy) => Box::new(StrategyAllocationUi { strategy }),
                None => stdin_ui(config.default_strategy),
            };
            run_allocate(sale_id, &ledger_path, ui.as_mut(), out).map(|_| ())
        }
        Command::Lots { ledger } => run_lots(&ledger_path(&ledger, config)?, out),
    }
}

/// Returned Err is for exit code determination only.
/// All errors are written to stderr.
pub fn command_main() -> Result<(), ()> {
    let args = Args::parse();

    if args.verbose {
        crate::tracing::enable_verbose();
    }
    crate::tracing::setup_tracing();
    tracing::debug!("{:#?}", args);

    let mut err_printer = WriteHandle::stderr_write_handle();
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            write_errln!(err_printer, "Error: {}", e);
            return Err(());
        }
    };

    run_command(args.command, &config).map_err(|e| {
        write_errln!(err_printer, "Error: {}", e);
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use crate::app::config::Config;
    use crate::lots::LotAllocationStrategy;
    use crate::testlib::assert_re;

    use super::{ledger_path, Args, Command, LedgerArgs};

    #[test]
    fn test_parse_import_args() {
        let args = Args::try_parse_from([
            "taxlot", "import", "gains.tsv", "--ledger", "ledger.json",
            "--strategy", "lowest-price", "--non-interactive", "--dry-run", "-v",
        ])
        .unwrap();
        assert!(args.verbose);
        match args.command {
            Command::Import { report, ledger, strategy, non_interactive, dry_run } => {
                assert_eq!(report, PathBuf::from("gains.tsv"));
                assert_eq!(ledger.ledger, Some(PathBuf::from("ledger.json")));
                assert_eq!(strategy, Some(LotAllocationStrategy::LowestPrice));
                assert!(non_interactive);
                assert!(dry_run);
            }
            c => panic!("Unexpected command {:?}", c),
        }

        assert!(Args::try_parse_from(["taxlot", "import"]).is_err());
        assert!(Args::try_parse_from(
            ["taxlot", "import", "gains.tsv", "--strategy", "random"]).is_err());
    }

    #[test]
    fn test_parse_allocate_and_lots_args() {
        let args = Args::try_parse_from(["taxlot", "allocate", "42", "-l", "l.json"]).unwrap();
        match args.command {
            Command::Allocate { sale_id, ledger, strategy } => {
                assert_eq!(sale_id, 42);
                assert_eq!(ledger.ledger, Some(PathBuf::from("l.json")));
                assert_eq!(strategy, None);
            }
            c => panic!("Unexpected command {:?}", c),
        }

        let args = Args::try_parse_from(["taxlot", "lots"]).unwrap();
        assert!(matches!(args.command, Command::Lots { ledger: LedgerArgs { ledger: None } }));
        assert!(!args.verbose);
    }

    #[test]
    fn test_ledger_path() {
        let config = Config { ledger: Some(PathBuf::from("/cfg/ledger.json")), ..Config::default() };
        let given = LedgerArgs { ledger: Some(PathBuf::from("mine.json")) };
        let absent = LedgerArgs { ledger: None };

        assert_eq!(ledger_path(&given, &config).unwrap(), PathBuf::from("mine.json"));
        assert_eq!(ledger_path(&absent, &config).unwrap(), PathBuf::from("/cfg/ledger.json"));
        assert_re("No ledger file given", &ledger_path(&absent, &Config::default()).unwrap_err());
    }
}
