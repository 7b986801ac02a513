//! Interactive console workflow
//!
//! Analyze, report, then ask for a range, apply it and let the user either
//! keep the result or revert and try another range.

use crate::analysis;
use crate::config::Config;
use crate::error::AdjustError;
use crate::report;
use crate::session::Session;
use crate::stretch::ContrastLimits;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// What to do with an applied session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Finish,
    Revert,
}

/// Line-oriented question/answer loop over any reader and writer
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `question` and return the trimmed answer
    fn ask(&mut self, question: &str) -> Result<String, AdjustError> {
        write!(self.output, "{}", question).map_err(console_error)?;
        self.output.flush().map_err(console_error)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(console_error)?;
        if read == 0 {
            return Err(AdjustError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    /// Ask until the answer is an integer in `lowest..=255`
    fn ask_value(&mut self, question: &str, lowest: u8) -> Result<u8, AdjustError> {
        loop {
            let answer = self.ask(question)?;
            match answer.parse::<u8>() {
                Ok(value) if value >= lowest => return Ok(value),
                _ => continue,
            }
        }
    }

    /// Ask for MinValue, then for a MaxValue above it
    pub fn read_limits(&mut self) -> Result<ContrastLimits, AdjustError> {
        let min = self.ask_value("Min Value: ", 0)?;
        if min == u8::MAX {
            // no valid MaxValue exists above 255
            writeln!(self.output, "Min Value must be below 255").map_err(console_error)?;
            return self.read_limits();
        }
        let max = self.ask_value("Max Value: ", min + 1)?;
        ContrastLimits::try_new(min, max)
    }

    pub fn read_decision(&mut self) -> Result<Decision, AdjustError> {
        loop {
            let answer = self.ask("Press 'F' to finish or 'R' to revert: ")?;
            match answer.chars().next().map(|c| c.to_ascii_uppercase()) {
                Some('F') => return Ok(Decision::Finish),
                Some('R') => return Ok(Decision::Revert),
                _ => continue,
            }
        }
    }

    pub fn say(&mut self, message: &str) -> Result<(), AdjustError> {
        writeln!(self.output, "{}", message).map_err(console_error)
    }
}

fn console_error(e: std::io::Error) -> AdjustError {
    AdjustError::io("<console>", e)
}

/// Full analyze, choose, apply, finish-or-revert loop
///
/// Returns the finished session.
pub fn run_interactive<R: BufRead, W: Write>(
    paths: &[PathBuf],
    config: &Config,
    charts: bool,
    prompter: &mut Prompter<R, W>,
) -> Result<Session, AdjustError> {
    let analysis = analysis::analyze_batch(paths, config)?;
    let report_path = report::write_report(&analysis, config, &paths[0], charts)?;
    prompter.say(&format!("Analysis report saved to: {}", report_path.display()))?;

    for (cutoff, average) in analysis.cutoffs.iter().zip(&analysis.averages) {
        prompter.say(&format!(
            "Average at {}: Min {} / Max {}",
            cutoff.label(),
            average.min,
            average.max
        ))?;
    }

    loop {
        let limits = prompter.read_limits()?;
        let session = Session::apply(paths, limits, config)?;
        let manifest = session.save_manifest()?;

        match prompter.read_decision()? {
            Decision::Finish => {
                let log = session.finish()?;
                Session::discard_manifest(&manifest)?;
                prompter.say(&format!("Adjustment info saved to: {}", log.display()))?;
                return Ok(session);
            }
            Decision::Revert => {
                session.revert()?;
                Session::discard_manifest(&manifest)?;
                prompter.say("Adjustment reverted")?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_limits_retry_until_valid() {
        let mut p = prompter("abc\n300\n20\n10\n20\n180\n");
        let limits = p.read_limits().unwrap();
        assert_eq!(limits, ContrastLimits { min: 20, max: 180 });
        let transcript = String::from_utf8(p.output).unwrap();
        assert_eq!(transcript.matches("Min Value: ").count(), 3);
        assert_eq!(transcript.matches("Max Value: ").count(), 3);
    }

    #[test]
    fn test_min_of_255_is_asked_again() {
        let mut p = prompter("255\n0\n255\n");
        assert_eq!(p.read_limits().unwrap(), ContrastLimits::FULL);
    }

    #[test]
    fn test_decision_is_case_insensitive() {
        assert_eq!(prompter("x\nf\n").read_decision().unwrap(), Decision::Finish);
        assert_eq!(prompter("Revert\n").read_decision().unwrap(), Decision::Revert);
    }

    #[test]
    fn test_closed_input_is_an_error() {
        assert!(matches!(prompter("12\n").read_limits(), Err(AdjustError::InputClosed)));
        assert!(matches!(prompter("").read_decision(), Err(AdjustError::InputClosed)));
    }

    #[test]
    fn test_revert_then_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        RgbImage::from_fn(8, 8, |x, _| Rgb([(x * 30) as u8, (x * 30) as u8, (x * 30) as u8]))
            .save(&path)
            .unwrap();

        let mut p = prompter("10\n200\nR\n0\n210\nF\n");
        let session = run_interactive(&[path.clone()], &Config::default(), false, &mut p).unwrap();

        assert_eq!(session.limits, ContrastLimits { min: 0, max: 210 });
        assert!(dir.path().join("scan-Adjusted.png").exists());
        assert!(dir.path().join("Adjusted/scan.png").exists());
        let work_dir = dir.path().join("Adjusted");
        let names: Vec<String> = std::fs::read_dir(&work_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("Analyzed-") && n.ends_with(".htm")));
        assert!(names.iter().any(|n| n.starts_with("Adjusted-") && n.ends_with(".txt")));
        assert!(!names.iter().any(|n| n.starts_with("Session-")));
    }
}
