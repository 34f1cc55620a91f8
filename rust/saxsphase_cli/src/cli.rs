use clap::{
    Parser,
    Subcommand,
};
use saxsphase::{
    DetectionAlgorithm,
    SpaceGroup,
};
use std::path::PathBuf;

use crate::config::EnhancementChoice;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the whole pipeline on one curve.
    Analyze(AnalyzeArgs),
    /// Execute a session script, one command per line.
    Run(RunArgs),
    /// Write a template configuration file.
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Two-column (q, I) text file.
    #[arg(short, long)]
    pub input: PathBuf,

    /// JSON configuration; flags below take precedence.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Restrict the analysis to this q window.
    #[arg(long, num_args = 2, value_names = ["Q_MIN", "Q_MAX"])]
    pub trim: Option<Vec<f64>>,

    /// Enhancement name, or "auto" to use the best-scoring one.
    #[arg(short, long)]
    pub enhancement: Option<EnhancementChoice>,

    /// Detector (std, cwt or hybrid). Defaults to the suggested one.
    #[arg(short, long)]
    pub algorithm: Option<DetectionAlgorithm>,

    /// Space group. Defaults to the best-ranked one.
    #[arg(short, long)]
    pub group: Option<SpaceGroup>,

    /// Reference peak q1. Defaults to the first analysis peak.
    #[arg(short, long)]
    pub reference: Option<f64>,

    /// Number of predicted reflections (5 to 10).
    #[arg(short, long)]
    pub n: Option<usize>,

    /// Where to write the JSON report.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Session script; reads stdin when omitted.
    pub script: Option<PathBuf>,

    /// JSON configuration for the engine.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct WriteTemplateArgs {
    /// The path of the configuration file to write.
    #[arg(short, long)]
    pub output_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use saxsphase::Enhancement;

    #[test]
    fn test_parse_analyze() {
        let args = Args::try_parse_from([
            "saxsphase",
            "analyze",
            "-i",
            "curve.dat",
            "--trim",
            "0.01",
            "0.3",
            "-e",
            "wavelet",
            "-a",
            "cwt",
            "-g",
            "Pn3m",
            "-n",
            "7",
        ])
        .unwrap();
        let Some(Commands::Analyze(analyze)) = args.command else {
            panic!("expected analyze");
        };
        assert_eq!(analyze.trim, Some(vec![0.01, 0.3]));
        assert_eq!(
            analyze.enhancement,
            Some(EnhancementChoice::Fixed(Enhancement::WaveletDenoised))
        );
        assert_eq!(analyze.algorithm, Some(DetectionAlgorithm::Cwt));
        assert_eq!(analyze.group, Some(SpaceGroup::Pn3m));
        assert_eq!(analyze.n, Some(7));
        assert!(analyze.reference.is_none());
    }

    #[test]
    fn test_rejects_unknown_group() {
        let res = Args::try_parse_from(["saxsphase", "analyze", "-i", "x", "-g", "fd3m"]);
        assert!(res.is_err());
    }
}
