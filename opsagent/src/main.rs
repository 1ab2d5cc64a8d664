#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use args::{Args, Service};
use clap::Parser;
use opsagent_confgen::{Generated, Generator, Paths};
use opsagent_config::{PlatformFacts, UnifiedConfig};
use tempfile::NamedTempFile;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    opsagent_telemetry::init(args.log_format, &args.log_filter)?;

    run(&args)
}

fn run(args: &Args) -> anyhow::Result<()> {
    let platform = args.platform.clone().unwrap_or_else(PlatformFacts::current);
    let generator = Generator::for_platform(platform, Paths::new(&args.logs, &args.state));

    let user = UnifiedConfig::load(&args.input)?;

    if args.print_effective_config {
        print!("{}", generator.effective_config_for(&user)?);
        return Ok(());
    }

    let output = args.output.as_deref().context("an output directory is required")?;

    // Nothing touches the output directory unless every file was generated
    let generated = generator.generate_config(&user)?;
    write_files(output, &generated, args.service)?;

    tracing::info!(
        config_path = %args.input.display(),
        output_dir = %output.display(),
        logging_overridden = generated.default_pipeline_overridden.logging,
        metrics_overridden = generated.default_pipeline_overridden.metrics,
        "wrote engine configuration"
    );

    Ok(())
}

/// Stage every file next to its target, then rename them into place
///
/// A failure while staging leaves the previous files untouched.
fn write_files(output: &Path, generated: &Generated, service: Option<Service>) -> anyhow::Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;

    let selected = generated
        .files
        .iter()
        .filter(|(name, _)| service.is_none_or(|s| s.files().contains(&name.as_str())));

    let mut staged = Vec::new();
    for (name, contents) in selected {
        let mut file = NamedTempFile::new_in(output)
            .with_context(|| format!("failed to create a temporary file in {}", output.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("failed to stage {name}"))?;
        staged.push((output.join(name), file, contents.len()));
    }

    for (path, file, bytes) in staged {
        file.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), bytes, "wrote file");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn args(input: &Path, output: &Path) -> Args {
        Args::try_parse_from([
            "opsagent",
            "--in",
            &input.display().to_string(),
            "--out",
            &output.display().to_string(),
            "--platform",
            "linux",
            "--logs",
            "/logs",
            "--state",
            "/state",
        ])
        .unwrap()
    }

    #[test]
    fn writes_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("config.yaml");
        std::fs::write(&input, "logging:\n  service:\n    log_level: debug\n").unwrap();
        let output = dir.path().join("out");

        run(&args(&input, &output)).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(&output)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["fluent_bit_main.conf", "fluent_bit_parser.conf", "otel.yaml"]);

        let main = std::fs::read_to_string(output.join("fluent_bit_main.conf")).unwrap();
        assert!(main.contains("    Log_Level                 debug\n"), "{main}");
        assert!(main.contains("/state/buffers/default_pipeline_syslog"));
    }

    #[test]
    fn service_limits_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let mut args = args(&dir.path().join("missing.yaml"), &output);
        args.service = Some(Service::Otel);

        run(&args).unwrap();

        assert!(output.join("otel.yaml").exists());
        assert!(!output.join("fluent_bit_main.conf").exists());
    }

    #[test]
    fn invalid_config_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("config.yaml");
        std::fs::write(
            &input,
            indoc! {"
                metrics:
                  service:
                    pipelines:
                      p:
                        receivers: [nope]
            "},
        )
        .unwrap();
        let output = dir.path().join("out");

        let err = run(&args(&input, &output)).unwrap_err();

        assert!(err.to_string().starts_with("the agent config is not valid:"), "{err}");
        assert!(!output.exists());
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&args(dir.path(), &dir.path().join("out"))).unwrap_err();
        assert!(err.to_string().starts_with("failed to read config file"), "{err}");
    }

    #[test]
    fn previous_files_are_replaced_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(output.join("otel.yaml"), "stale").unwrap();

        run(&args(&dir.path().join("missing.yaml"), &output)).unwrap();

        assert_ne!(std::fs::read_to_string(output.join("otel.yaml")).unwrap(), "stale");
        assert_eq!(std::fs::read_dir(&output).unwrap().count(), 3);
    }

    #[test]
    fn failed_write_keeps_remaining_files() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        // A non-empty directory where the first file belongs cannot be replaced
        std::fs::create_dir_all(output.join("fluent_bit_main.conf").join("blocker")).unwrap();
        std::fs::write(output.join("otel.yaml"), "previous").unwrap();

        let err = run(&args(&dir.path().join("missing.yaml"), &output)).unwrap_err();

        assert!(err.to_string().starts_with("failed to write"), "{err}");
        assert_eq!(std::fs::read_to_string(output.join("otel.yaml")).unwrap(), "previous");
        let mut names: Vec<_> = std::fs::read_dir(&output)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["fluent_bit_main.conf", "otel.yaml"]);
    }
}
