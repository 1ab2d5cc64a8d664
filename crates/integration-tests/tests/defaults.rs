//! Built-in defaults, determinism and independence of generation runs

mod harness;

use std::thread;

use harness::config::ConfigBuilder;
use harness::generator::{self, LOGS_DIR, STATE_DIR, generate, sections};
use indoc::indoc;
use opsagent_confgen::{Generator, Paths};
use opsagent_config::{BuiltinConfig, Os, PlatformFacts};

#[test]
fn builtin_document_renders_like_empty_input() {
    for platform in [PlatformFacts::new(Os::Linux), PlatformFacts::new(Os::Windows)] {
        let generator = generator::for_platform(platform.clone());
        let builtin = BuiltinConfig::for_platform(&platform);

        let from_empty = generator.generate("").unwrap();
        let from_builtin = generator.generate_config(&builtin.config).unwrap();

        assert_eq!(from_empty.files, from_builtin.files, "platform {}", platform.key());
        assert!(from_builtin.default_pipeline_overridden.logging);
        assert!(from_builtin.default_pipeline_overridden.metrics);
    }
}

#[test]
fn each_domain_falls_back_independently() {
    let defaults = generate("");
    let metrics_only = generate(indoc! {"
        metrics:
          service:
            pipelines:
              mine:
                receivers: [hostmetrics]
                exporters: [google]
    "});

    assert_eq!(metrics_only.files["fluent_bit_main.conf"], defaults.files["fluent_bit_main.conf"]);
    assert_eq!(metrics_only.files["fluent_bit_parser.conf"], defaults.files["fluent_bit_parser.conf"]);
    assert_ne!(metrics_only.files["otel.yaml"], defaults.files["otel.yaml"]);
    assert!(metrics_only.default_pipeline_overridden.metrics);
    assert!(!metrics_only.default_pipeline_overridden.logging);
}

#[test]
fn default_linux_logging_sections() {
    let generated = generate("");
    let main = &generated.files["fluent_bit_main.conf"];

    let headers: Vec<_> = sections(main)
        .into_iter()
        .map(|section| {
            let name = section
                .lines()
                .find_map(|line| line.trim().strip_prefix("Name"))
                .map_or("", str::trim);
            format!("{} {name}", section.lines().next().unwrap_or_default())
        })
        .collect();
    assert_eq!(headers, [
        "[SERVICE] ",
        "[INPUT] tail",
        "[INPUT] tail",
        "[INPUT] tail",
        "[FILTER] modify",
        "[FILTER] rewrite_tag",
        "[FILTER] modify",
        "[OUTPUT] stackdriver",
        "[OUTPUT] stackdriver",
    ]);
    assert!(main.contains(&format!("    DB                {STATE_DIR}/buffers/default_pipeline_syslog\n")));
    assert!(main.contains(&format!("    Path              {LOGS_DIR}/subagents/logging-module.log\n")));
}

#[test]
fn substituted_defaults_are_honored() {
    let generator = Generator::new(
        BuiltinConfig::empty(),
        PlatformFacts::new(Os::Linux),
        Paths::new(LOGS_DIR, STATE_DIR),
    )
    .with_version("latest");

    let generated = generator.generate("").unwrap();

    let main = &generated.files["fluent_bit_main.conf"];
    assert!(!main.contains("default_pipeline"), "{main}");
    assert!(main.contains("Tag               ops-agent-fluent-bit\n"));

    let otel: serde_yaml::Value = serde_yaml::from_str(&generated.files["otel.yaml"]).unwrap();
    let pipelines = otel["service"]["pipelines"].as_mapping().unwrap();
    let names: Vec<_> = pipelines.keys().filter_map(serde_yaml::Value::as_str).collect();
    assert_eq!(names, ["metrics/agent"]);
}

#[test]
fn repeated_generation_is_byte_identical() {
    let raw = indoc! {r#"
        logging:
          receivers:
            nginx_access:
              type: files
              include_paths: [/var/log/nginx/access.log]
            app:
              type: files
              include_paths: [/srv/app/*.log]
              exclude_paths: [/srv/app/debug.log]
          processors:
            drop_health:
              type: exclude_logs
              match_any:
              - 'jsonPayload.path =~ "^/healthz"'
            json:
              type: parse_json
              time_key: ts
          exporters:
            gcl:
              type: google_cloud_logging
          service:
            pipelines:
              web:
                receivers: [nginx_access]
                processors: [lib:nginx, drop_health]
                exporters: [gcl]
              app:
                receivers: [app]
                processors: [json]
                exporters: [gcl]
        metrics:
          receivers:
            prom:
              type: prometheus
              scrape_configs:
              - job_name: app
                targets: [localhost:9090]
          processors:
            drop_disk:
              type: exclude_metrics
              metrics_pattern: [agent.googleapis.com/disk/*]
          service:
            pipelines:
              default_pipeline:
                receivers: [hostmetrics, prom]
                processors: [drop_disk]
                exporters: [google]
    "#};

    let first = generate(raw);
    for _ in 0..5 {
        assert_eq!(generate(raw), first);
    }
}

#[test]
fn concurrent_runs_do_not_interfere() {
    let generator = generator::linux();
    let inputs: Vec<String> = (0..8)
        .map(|i| {
            let config = ConfigBuilder::new()
                .with_files_receiver(&format!("r{i}"), &[&format!("/var/log/app{i}.log")], &[])
                .with_logging_exporter("google")
                .with_logging_pipeline(&format!("p{i}"), &[&format!("r{i}")], &[], &["google"])
                .build();
            config.to_yaml().unwrap()
        })
        .collect();

    let sequential: Vec<_> = inputs.iter().map(|raw| generator.generate(raw).unwrap()).collect();

    let shared = &generator;
    let concurrent: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|raw| scope.spawn(move || shared.generate(raw).unwrap()))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(concurrent, sequential);
    for (i, generated) in concurrent.iter().enumerate() {
        let main = &generated.files["fluent_bit_main.conf"];
        assert!(main.contains(&format!("/var/log/app{i}.log")));
        assert_eq!(main.matches("/var/log/app").count(), 1, "{main}");
    }
}
