//! End-to-end declarations interpreted by every backend

use jobline::prelude::*;
use pretty_assertions::assert_eq;

/// Two steps; the first chains a producer, a consumer/producer and a final
/// consumer behind two plain tasks.
fn declare_release(builder: &mut Builder) -> Result<(), DeclarationError> {
    let first = ArtifactSlot::new();
    let second = ArtifactSlot::new();

    builder.job("JobName", |job| {
        job.step("Stage1", |step| {
            let (p1_out, p1_in) = (first.clone(), first.clone());
            let (p2_out, p2_in) = (second.clone(), second.clone());

            step.task("ATask", |t| {
                t.sh("echo Task1 done");
                Ok(())
            })?
            .task("SecondTask", move |t| {
                t.sh("echo SecondTask done");
                p1_out.set(t.produce_artifact("P1", ["./out"])?)
            })?
            .and_then("ThirdTask", move |t| {
                t.sh("echo Enter Task 3");
                t.consume_slot(&p1_in)?;
                let producer = p1_in
                    .get()
                    .map(|a| a.producer().name.clone())
                    .unwrap_or_default();
                t.sh(format!("echo Using Artifact produced by: {producer}"));
                t.sh("echo ThirdTask done");
                p2_out.set(t.produce_artifact("P2", ["./out"])?)
            })?
            .and_then("LastTask", move |t| {
                t.sh("echo Enter Task 4");
                t.consume_slot(&p2_in)?;
                Ok(())
            })?;
            Ok(())
        })?;

        job.step("Stage2", |step| {
            step.task("AnotherTask", |t| {
                t.sh("echo Stage 2, another task");
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })?;

    Ok(())
}

fn render(mut builder: Builder) -> String {
    declare_release(&mut builder).unwrap();
    builder.finish().unwrap().to_string()
}

#[test]
fn test_gitlab_release_output() {
    let expected = "\
stages:
  - Stage1
  - Stage2

ATask:
  stage: Stage1
  script:
    - echo Task1 done

SecondTask:
  stage: Stage1
  script:
    - echo SecondTask done
  artifacts:
    paths:
      - ./out

ThirdTask:
  stage: Stage1
  script:
    - echo Enter Task 3
    - echo Using Artifact produced by: SecondTask
    - echo ThirdTask done
  artifacts:
    paths:
      - ./out

LastTask:
  stage: Stage1
  script:
    - echo Enter Task 4

AnotherTask:
  stage: Stage2
  script:
    - echo Stage 2, another task
";

    assert_eq!(render(Builder::gitlab()), expected);
}

#[test]
fn test_azure_release_dependencies() {
    let output = render(Builder::azure_devops());

    assert!(output.starts_with("# JobName\nstages:\n- Stage1\n- Stage2\nsteps:\n"));
    assert!(output.contains("  displayName: Stage1 / ThirdTask\n  dependsOn: [SecondTask]\n"));
    assert!(output.contains("  displayName: Stage1 / LastTask\n  dependsOn: [ThirdTask]\n"));
    assert_eq!(output.matches("dependsOn").count(), 2);
}

#[test]
fn test_rendering_is_deterministic() {
    for _ in 0..3 {
        assert_eq!(render(Builder::gitlab()), render(Builder::gitlab()));
        assert_eq!(render(Builder::azure_devops()), render(Builder::azure_devops()));
    }
}

#[test]
fn test_local_release_runs_every_task() {
    let mut builder = Builder::local(ExecutorConfig::new().with_workers(4).quiet()).unwrap();
    declare_release(&mut builder).unwrap();

    let output = builder.finish().unwrap();
    let summary = output.summary().unwrap();

    assert_eq!(summary.tasks_finished, 5);
    assert_eq!(summary.failed_commands, 0);
    assert!(summary.declaration_errors.is_empty());
}

#[test]
fn test_missing_artifact_fails_on_every_backend() {
    fn declare(builder: &mut Builder) -> Result<(), DeclarationError> {
        builder.job("Job", |job| {
            job.step("Build", |step| {
                step.task("Orphan", |t| {
                    t.consume_artifact(None)?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    }

    let expected = DeclarationError::MissingArtifact {
        task: "Orphan".to_string(),
    };

    for mut builder in [Builder::gitlab(), Builder::azure_devops()] {
        assert_eq!(declare(&mut builder), Err(expected.clone()));
    }

    let mut builder = Builder::local(ExecutorConfig::new().quiet()).unwrap();
    declare(&mut builder).unwrap();
    assert_eq!(
        builder.finish(),
        Err(PipelineError::Declaration(expected))
    );
}

#[test]
fn test_second_artifact_fails_on_every_backend() {
    fn declare(builder: &mut Builder) -> Result<(), DeclarationError> {
        builder.job("Job", |job| {
            job.step("Build", |step| {
                step.task("Greedy", |t| {
                    t.produce_artifact("one", ["./a"])?;
                    t.produce_artifact("two", ["./b"])?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    }

    let expected = DeclarationError::ArtifactAlreadyProduced {
        task: "Greedy".to_string(),
        existing: "one".to_string(),
        requested: "two".to_string(),
    };

    let mut builder = Builder::gitlab();
    assert_eq!(declare(&mut builder), Err(expected.clone()));

    let mut builder = Builder::local(ExecutorConfig::new().quiet()).unwrap();
    declare(&mut builder).unwrap();
    assert_eq!(
        builder.finish(),
        Err(PipelineError::Declaration(expected))
    );
}

#[test]
fn test_builder_from_yaml_config() {
    let config = Config::from_yaml_str("target: gitlab\nlog_level: warn\n").unwrap();
    let builder = Builder::from_config(&config).unwrap();
    assert_eq!(render(builder), render(Builder::gitlab()));
}
