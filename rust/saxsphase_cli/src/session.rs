//! Line-oriented session scripts.
//!
//! Each non-blank line that does not start with `#` is one command, parsed
//! with the same clap derive machinery as the command line itself.

use clap::{
    Parser,
    Subcommand,
};
use saxsphase::io::write_report;
use saxsphase::{
    DetectionAlgorithm,
    Engine,
    SpaceGroup,
};
use std::io::{
    BufRead,
    Write,
};
use std::path::PathBuf;
use tracing::{
    debug,
    info,
    warn,
};

use crate::config::EnhancementChoice;
use crate::error::CliError;
use crate::tables;

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
pub struct SessionLine {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Load {
        path: PathBuf,
    },
    Trim {
        q_min: f64,
        q_max: f64,
    },
    /// Apply an enhancement, or the best-scoring one with `auto`.
    Enhance {
        choice: EnhancementChoice,
    },
    /// Score every enhancement without applying any.
    Compare,
    Suggest,
    Detect {
        #[arg(long)]
        algo: Option<DetectionAlgorithm>,
    },
    Add {
        q: f64,
    },
    Remove {
        q: f64,
    },
    ClearManual,
    Merge,
    /// Toggle the detected peak nearest to `q` in or out of the selection.
    Select {
        q: f64,
    },
    SelectAll,
    ClearSelection,
    DisableSelection,
    Predict {
        #[arg(long)]
        group: SpaceGroup,
        #[arg(long = "ref")]
        reference: f64,
        #[arg(long)]
        n: Option<usize>,
    },
    ScoreAll {
        #[arg(long = "ref")]
        reference: f64,
    },
    Crystallo,
    Save {
        path: PathBuf,
    },
}

pub fn parse_line(line_no: usize, line: &str) -> Result<Option<SessionCommand>, CliError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    SessionLine::try_parse_from(line.split_whitespace())
        .map(|l| Some(l.command))
        .map_err(|e| CliError::Script {
            line: line_no,
            msg: e.to_string().trim().to_string(),
        })
}

/// An engine plus the sink that command output is printed to.
pub struct Session<W: Write> {
    engine: Engine,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(engine: Engine, out: W) -> Self {
        Self { engine, out }
    }

    #[cfg(test)]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (Engine, W) {
        (self.engine, self.out)
    }

    /// Runs every command of `script`, stopping at the first failure.
    pub fn run_script(&mut self, script: impl BufRead) -> Result<usize, CliError> {
        let mut executed = 0;
        for (idx, line) in script.lines().enumerate() {
            let line = line?;
            let Some(command) = parse_line(idx + 1, &line)? else {
                continue;
            };
            debug!("Line {}: {:?}", idx + 1, command);
            if let Err(e) = self.execute(command) {
                warn!("Session stopped at line {}", idx + 1);
                return Err(e);
            }
            executed += 1;
        }
        info!("Executed {} session commands", executed);
        Ok(executed)
    }

    pub fn execute(&mut self, command: SessionCommand) -> Result<(), CliError> {
        match command {
            SessionCommand::Load { path } => {
                let summary = self.engine.load_path(&path)?;
                writeln!(self.out, "{}", serde_json::to_string_pretty(&summary)?)?;
            }
            SessionCommand::Trim { q_min, q_max } => {
                let summary = self.engine.trim(q_min, q_max)?;
                writeln!(
                    self.out,
                    "Trimmed to [{:.5}, {:.5}] ({} samples)",
                    summary.q_min, summary.q_max, summary.num_points
                )?;
            }
            SessionCommand::Enhance { choice } => {
                let applied = match choice {
                    EnhancementChoice::Auto => {
                        let best = self.engine.enhance_best()?;
                        if let Some(comparison) = self.engine.comparison() {
                            writeln!(self.out, "{}", tables::comparison_table(comparison))?;
                        }
                        best
                    }
                    EnhancementChoice::Fixed(e) => {
                        self.engine.enhance(e)?;
                        e
                    }
                };
                writeln!(self.out, "Enhancement: {}", applied)?;
            }
            SessionCommand::Compare => {
                let comparison = self.engine.compare_enhancements()?;
                writeln!(self.out, "{}", tables::comparison_table(comparison))?;
            }
            SessionCommand::Suggest => {
                let suggestion = self.engine.suggest_detection()?;
                writeln!(self.out, "{}", serde_json::to_string_pretty(&suggestion)?)?;
            }
            SessionCommand::Detect { algo } => {
                let peaks = self.engine.detect_suggested(algo)?;
                writeln!(self.out, "Detected {} peaks: {}", peaks.len(), format_qs(peaks))?;
            }
            SessionCommand::Add { q } => {
                if self.engine.add_manual(q)? {
                    writeln!(self.out, "Added manual peak {:.5}", q)?;
                } else {
                    writeln!(self.out, "Peak {:.5} duplicates an existing peak", q)?;
                }
            }
            SessionCommand::Remove { q } => match self.engine.remove_manual(q)? {
                Some(removed) => writeln!(self.out, "Removed manual peak {:.5}", removed)?,
                None => writeln!(self.out, "No manual peak near {:.5}", q)?,
            },
            SessionCommand::ClearManual => {
                self.engine.clear_manual()?;
                writeln!(self.out, "Cleared manual peaks")?;
            }
            SessionCommand::Merge => {
                self.engine.merge_manual()?;
                let peaks = self.engine.peaks()?;
                writeln!(self.out, "Merged: {}", format_qs(peaks.auto()))?;
            }
            SessionCommand::Select { q } => match self.engine.toggle_select(q)? {
                Some((peak, true)) => writeln!(self.out, "Selected {:.5}", peak)?,
                Some((peak, false)) => writeln!(self.out, "Deselected {:.5}", peak)?,
                None => writeln!(self.out, "No detected peak near {:.5}", q)?,
            },
            SessionCommand::SelectAll => {
                self.engine.select_all()?;
                writeln!(self.out, "Selected all detected peaks")?;
            }
            SessionCommand::ClearSelection => {
                self.engine.clear_selection()?;
                writeln!(self.out, "Selection cleared")?;
            }
            SessionCommand::DisableSelection => {
                self.engine.disable_selection()?;
                writeln!(self.out, "Selection disabled")?;
            }
            SessionCommand::Predict {
                group,
                reference,
                n,
            } => {
                self.engine.set_space_group(group);
                self.engine.set_reference(reference)?;
                if let Some(n) = n {
                    self.engine.set_count(n)?;
                }
                let prediction = self.engine.predict()?;
                writeln!(self.out, "{}", tables::prediction_table(prediction))?;
                match self.engine.confidence() {
                    Ok(record) => writeln!(
                        self.out,
                        "{} confidence {:.3} ({})",
                        record.space_group, record.score, record.interpretation
                    )?,
                    Err(e) => warn!("No confidence for this prediction: {}", e),
                }
            }
            SessionCommand::ScoreAll { reference } => {
                self.engine.set_reference(reference)?;
                let ranking = self.engine.score_all()?;
                writeln!(self.out, "{}", tables::ranking_table(ranking))?;
            }
            SessionCommand::Crystallo => {
                let record = self.engine.crystallography()?;
                writeln!(self.out, "{}", serde_json::to_string_pretty(record)?)?;
            }
            SessionCommand::Save { path } => {
                write_report(&path, &self.engine.report()?)?;
                writeln!(self.out, "Wrote report to {}", path.display())?;
            }
        }
        Ok(())
    }
}

fn format_qs(qs: &[f64]) -> String {
    let parts: Vec<String> = qs.iter().map(|q| format!("{:.5}", q)).collect();
    format!("[{}]", parts.join(", "))
}
