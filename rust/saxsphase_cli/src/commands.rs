use saxsphase::io::{
    read_curve,
    write_report_to,
};
use saxsphase::{
    AnalysisReport,
    Engine,
    SaxsError,
};
use std::fs::File;
use std::io::{
    self,
    BufReader,
    Write,
};
use std::path::Path;
use tracing::{
    info,
    instrument,
    warn,
};

use crate::cli::{
    AnalyzeArgs,
    RunArgs,
    WriteTemplateArgs,
};
use crate::config::{
    Config,
    EnhancementChoice,
};
use crate::error::CliError;
use crate::session::Session;
use crate::tables;

fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    match path {
        Some(path) => {
            info!("Reading configuration from {}", path.display());
            Config::from_path(path)
        }
        None => Ok(Config::default()),
    }
}

/// Merges command-line overrides into the configuration.
fn resolve_analysis(args: &AnalyzeArgs, config: &mut Config) -> Result<(), CliError> {
    if let Some(choice) = args.enhancement {
        config.analysis.enhancement = choice;
    }
    if let Some(algorithm) = args.algorithm {
        config.analysis.algorithm = Some(algorithm);
    }
    if let Some(group) = args.group {
        config.analysis.space_group = Some(group);
    }
    if let Some(n) = args.n {
        config.analysis.count = Some(n);
    }
    config.validate()
}

/// Runs the whole pipeline and returns the resulting report.
#[instrument(skip_all)]
pub fn analyze(args: &AnalyzeArgs) -> Result<AnalysisReport, CliError> {
    let mut config = load_config(args.config.as_deref())?;
    resolve_analysis(args, &mut config)?;
    let analysis = config.analysis.clone();

    let mut engine = Engine::new(config.engine);
    engine.load(read_curve(&args.input)?);
    if let Some(window) = &args.trim {
        let [q_min, q_max] = window.as_slice() else {
            return Err(CliError::Config("--trim takes exactly two values".to_string()));
        };
        engine.trim(*q_min, *q_max)?;
    }

    match analysis.enhancement {
        EnhancementChoice::Auto => {
            let best = engine.enhance_best()?;
            if let Some(comparison) = engine.comparison() {
                info!("Enhancement comparison:\n{}", tables::comparison_table(comparison));
            }
            info!("Using best enhancement: {}", best);
        }
        EnhancementChoice::Fixed(e) => engine.enhance(e)?,
    }

    if let Some(group) = analysis.space_group {
        engine.set_space_group(group);
    }
    if let Some(count) = analysis.count {
        engine.set_count(count)?;
    }

    let peaks = engine.detect_suggested(analysis.algorithm)?.len();
    info!("Found {} peaks", peaks);

    let reference = match args.reference {
        Some(q) => q,
        None => *engine.analysis_peaks()?.first().ok_or(SaxsError::NoReference)?,
    };
    engine.set_reference(reference)?;

    let ranking = engine.score_all()?;
    info!("Space group ranking:\n{}", tables::ranking_table(ranking));
    let best = ranking.first().map(|r| r.space_group);
    if engine.space_group().is_none() {
        match best {
            Some(group) => {
                info!("No space group given, using the best ranked: {}", group);
                engine.set_space_group(group);
                engine.score_all()?;
            }
            None => warn!("Nothing was ranked"),
        }
    }

    info!("Predicted peaks:\n{}", tables::prediction_table(engine.predict()?));
    let confidence = engine.confidence()?;
    info!(
        "{} confidence {:.3} ({})",
        confidence.space_group, confidence.score, confidence.interpretation
    );
    let crystal = engine.crystallography()?;
    info!("Lattice constant a = {:.3}", crystal.lattice.a);

    Ok(engine.report()?)
}

/// Writes the report to `output`, or to `stdout` when no path is given.
/// Nothing else goes to `stdout`, so it can be piped as JSON.
fn emit_report(report: &AnalysisReport, output: Option<&Path>, stdout: impl Write) -> Result<(), CliError> {
    match output {
        Some(path) => saxsphase::io::write_report(path, report)?,
        None => write_report_to(stdout, report)?,
    }
    Ok(())
}

/// Main function for the 'analyze' subcommand.
pub fn main_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let report = analyze(&args)?;
    emit_report(&report, args.output.as_deref(), io::stdout().lock())
}

/// Main function for the 'run' subcommand.
pub fn main_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let mut session = Session::new(Engine::new(config.engine), io::stdout().lock());
    match &args.script {
        Some(path) => {
            let file = File::open(path)?;
            session.run_script(BufReader::new(file))?;
        }
        None => {
            session.run_script(io::stdin().lock())?;
        }
    }
    Ok(())
}

/// Main function for the 'write-template' subcommand.
pub fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    if let Some(parent) = args.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&args.output_path, Config::template()?)?;
    println!("Wrote configuration template to {}", args.output_path.display());
    Ok(())
}
