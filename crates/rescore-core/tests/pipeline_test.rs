use pretty_assertions::assert_eq;
use rescore_core::{
    BatchProgress, BatchReport, ConversionOutcome, NoProgress, Pipeline, PipelineConfig,
};
use rescore_infra_notation_native::NativeInterpreter;
use rescore_ports::notation::{NotationError, NotationInterpreterPort};
use rescore_ports::types::{ErrorKind, NotationFormat, RenderFormat};
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_test::traced_test;
use zip::write::FileOptions;
use zip::ZipWriter;

const PREFIXED_SCORE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1"><part-name>Piano</part-name></score-part>
  </part-list>
  <part id="P1" omr:confidence="0.93">
    <measure number="1">
      <attributes><divisions>1</divisions></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration></note>
    </measure>
  </part>
</score-partwise>
"#;

/// Rejects documents containing a `<bad` tag; records every render target.
#[derive(Default)]
struct StubInterpreter {
    rendered: Mutex<Vec<PathBuf>>,
}

impl NotationInterpreterPort for StubInterpreter {
    type Score = String;

    fn parse(&self, text: &str, _format: NotationFormat) -> Result<String, NotationError> {
        if text.contains("<bad") {
            return Err(NotationError::Parse("rejected by stub".to_string()));
        }
        Ok(text.to_string())
    }

    fn render(
        &self,
        score: &String,
        _format: RenderFormat,
        output_path: &Path,
    ) -> Result<(), NotationError> {
        std::fs::write(output_path, score).map_err(|e| NotationError::Render(e.to_string()))?;
        self.rendered
            .lock()
            .unwrap()
            .push(output_path.to_path_buf());
        Ok(())
    }
}

fn write_archive(path: &Path, members: &[(&str, Vec<u8>)]) {
    let file = std::fs::File::create(path).expect("create archive");
    let mut zip = ZipWriter::new(file);
    for (name, data) in members {
        zip.start_file(*name, FileOptions::default())
            .expect("start entry");
        zip.write_all(data).expect("write entry");
    }
    zip.finish().expect("finish archive");
}

fn padded(text: &str, len: usize) -> Vec<u8> {
    let mut data = text.as_bytes().to_vec();
    data.resize(len.max(data.len()), b' ');
    data
}

fn stub_pipeline() -> Pipeline<StubInterpreter> {
    Pipeline::new(StubInterpreter::default(), PipelineConfig::default())
}

fn kinds(report: &BatchReport) -> Vec<Option<ErrorKind>> {
    report.outcomes().map(ConversionOutcome::error_kind).collect()
}

#[test]
fn archive_is_repaired_and_rendered_beside_a_broken_one() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("sonata.mxl");
    write_archive(
        &good,
        &[
            ("META-INF/container.xml", padded("<container/>", 80)),
            ("score.xml", padded(PREFIXED_SCORE, 4000)),
        ],
    );
    let broken = dir.path().join("broken.mxl");
    std::fs::write(&broken, b"PK\x03\x04 truncated").expect("write broken");

    let pipeline = Pipeline::new(NativeInterpreter::new(), PipelineConfig::default());
    let report = pipeline.run_batch(&[good.clone(), broken.clone()], &NoProgress);

    let repaired = dir.path().join("sonata.xml");
    let rendered = dir.path().join("sonata.mid");
    assert_eq!(
        report.artifacts[0].outcome,
        ConversionOutcome::Converted {
            outputs: vec![repaired.clone(), rendered.clone()]
        }
    );
    let repaired_text = std::fs::read_to_string(&repaired).expect("repaired written");
    assert!(repaired_text.contains(r#"<part id="P1" confidence="0.93">"#));
    assert!(!repaired_text.contains("omr:"));
    assert!(std::fs::read(&rendered)
        .expect("midi written")
        .starts_with(b"MThd"));

    assert_eq!(
        report.artifacts[1].outcome.error_kind(),
        Some(ErrorKind::CorruptArchive)
    );
    assert_eq!((report.converted(), report.failed()), (1, 1));
}

#[test]
fn missing_middle_artifact_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("one.mxl");
    let missing = dir.path().join("two.mxl");
    let third = dir.path().join("three.mxl");
    for path in [&first, &third] {
        write_archive(path, &[("score.xml", PREFIXED_SCORE.as_bytes().to_vec())]);
    }

    let pipeline = stub_pipeline();
    let report = pipeline.run_batch(&[first, missing, third], &NoProgress);

    assert_eq!(
        kinds(&report),
        vec![None, Some(ErrorKind::InputNotFound), None]
    );
    assert!(report.artifacts[0].outcome.is_converted());
    assert!(report.artifacts[2].outcome.is_converted());
    assert_eq!(
        *pipeline.interpreter().rendered.lock().unwrap(),
        vec![dir.path().join("one.mid"), dir.path().join("three.mid")]
    );
}

#[test]
fn outputs_are_named_from_text_before_first_period() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("My.Piece.v2.mxl");
    write_archive(&input, &[("score.xml", PREFIXED_SCORE.as_bytes().to_vec())]);

    let outcome = stub_pipeline().convert(&input);
    assert_eq!(
        outcome,
        ConversionOutcome::Converted {
            outputs: vec![dir.path().join("My.xml"), dir.path().join("My.mid")]
        }
    );
}

#[test]
fn unsupported_extension_fails_without_reading() {
    let dir = tempfile::tempdir().expect("tempdir");
    let outcome = stub_pipeline().convert(&dir.path().join("scan.pdf"));
    assert_eq!(outcome.error_kind(), Some(ErrorKind::UnsupportedFormat));
}

#[test]
fn plain_input_is_never_overwritten() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("etude.xml");
    std::fs::write(&input, PREFIXED_SCORE).expect("write input");

    let pipeline = stub_pipeline();
    let outcome = pipeline.convert(&input);

    assert_eq!(
        outcome,
        ConversionOutcome::Converted {
            outputs: vec![dir.path().join("etude.mid")]
        }
    );
    assert_eq!(
        std::fs::read_to_string(&input).expect("input kept"),
        PREFIXED_SCORE
    );
    let rendered = std::fs::read_to_string(dir.path().join("etude.mid")).expect("rendered");
    assert!(rendered.contains(r#"confidence="0.93""#));
}

#[test]
fn repaired_copy_can_be_disabled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("suite.mxl");
    write_archive(&input, &[("suite.xml", PREFIXED_SCORE.as_bytes().to_vec())]);

    let config = PipelineConfig {
        persist_repaired: false,
        ..PipelineConfig::default()
    };
    let outcome = Pipeline::new(StubInterpreter::default(), config).convert(&input);

    assert_eq!(
        outcome,
        ConversionOutcome::Converted {
            outputs: vec![dir.path().join("suite.mid")]
        }
    );
    assert!(!dir.path().join("suite.xml").exists());
}

#[test]
fn interpreter_rejection_is_a_conversion_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("rejected.musicxml");
    std::fs::write(&input, "<bad/>").expect("write input");

    let pipeline = stub_pipeline();
    let outcome = pipeline.convert(&input);

    assert_eq!(outcome.error_kind(), Some(ErrorKind::ConversionError));
    assert!(pipeline.interpreter().rendered.lock().unwrap().is_empty());
}

#[test]
fn duplicates_and_directories_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("waltz.mxl");
    write_archive(&input, &[("waltz.xml", PREFIXED_SCORE.as_bytes().to_vec())]);
    let folder = dir.path().join("folder.mxl");
    std::fs::create_dir(&folder).expect("create dir");

    let report = stub_pipeline().run_batch(&[input.clone(), input, folder], &NoProgress);

    assert!(report.artifacts[0].outcome.is_converted());
    assert!(matches!(
        report.artifacts[1].outcome,
        ConversionOutcome::Skipped { .. }
    ));
    assert!(matches!(
        report.artifacts[2].outcome,
        ConversionOutcome::Skipped { .. }
    ));
    assert_eq!(report.skipped(), 2);
}

#[derive(Default)]
struct RecordingProgress {
    events: RefCell<Vec<String>>,
}

impl BatchProgress for RecordingProgress {
    fn on_artifact_start(&self, index: usize, total: usize, _path: &Path) {
        self.events.borrow_mut().push(format!("start {index}/{total}"));
    }

    fn on_artifact_done(
        &self,
        index: usize,
        _total: usize,
        _path: &Path,
        outcome: &ConversionOutcome,
    ) {
        self.events
            .borrow_mut()
            .push(format!("done {index} converted={}", outcome.is_converted()));
    }
}

#[test]
fn progress_sees_every_artifact_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let progress = RecordingProgress::default();
    let paths = [dir.path().join("a.txt"), dir.path().join("b.mxl")];

    stub_pipeline().run_batch(&paths, &progress);

    assert_eq!(
        progress.events.into_inner(),
        vec![
            "start 0/2".to_string(),
            "done 0 converted=false".to_string(),
            "start 1/2".to_string(),
            "done 1 converted=false".to_string(),
        ]
    );
}

#[test]
fn report_serializes_outcomes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report = stub_pipeline().run_batch(&[dir.path().join("gone.mxl")], &NoProgress);

    let path = dir.path().join("reports/batch.json");
    report.write_json(&path).expect("write report");

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).expect("read report")).expect("json");
    assert_eq!(json["artifacts"][0]["status"], "failed");
    assert_eq!(json["artifacts"][0]["kind"], "input_not_found");
}

#[test]
fn out_of_range_score_fails_alone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let huge = dir.path().join("huge.musicxml");
    std::fs::write(
        &huge,
        PREFIXED_SCORE.replace("<duration>4</duration>", "<duration>1e30</duration>"),
    )
    .expect("write huge");
    let fine = dir.path().join("fine.musicxml");
    std::fs::write(&fine, PREFIXED_SCORE).expect("write fine");

    let pipeline = Pipeline::new(NativeInterpreter::new(), PipelineConfig::default());
    let report = pipeline.run_batch(&[huge, fine], &NoProgress);

    assert_eq!(kinds(&report), vec![Some(ErrorKind::ConversionError), None]);
    assert!(dir.path().join("fine.mid").exists());
    assert!(!dir.path().join("huge.mid").exists());
}

#[test]
fn repaired_copy_keeps_source_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = PREFIXED_SCORE.replace(
        "<score-partwise version=\"3.1\">",
        "<score-partwise version=\"3.1\">\n  <work><work-title>Café à la Mode</work-title></work>",
    );
    let input = dir.path().join("cafe.mxl");
    write_archive(&input, &[("cafe.xml", source.as_bytes().to_vec())]);

    let outcome = stub_pipeline().convert(&input);
    assert!(outcome.is_converted());

    let written = std::fs::read(dir.path().join("cafe.xml")).expect("repaired written");
    assert_eq!(written, source.replace("omr:", "").into_bytes());
    assert!(String::from_utf8(written)
        .expect("still utf-8")
        .contains("Café à la Mode</work-title>"));
}

#[cfg(target_os = "linux")]
#[test]
fn case_variant_sibling_is_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("Score.XML");
    std::fs::write(&input, PREFIXED_SCORE).expect("write input");

    let outcome = stub_pipeline().convert(&input);

    let repaired = dir.path().join("Score.xml");
    assert_eq!(
        outcome,
        ConversionOutcome::Converted {
            outputs: vec![repaired.clone(), dir.path().join("Score.mid")]
        }
    );
    assert!(!std::fs::read_to_string(&repaired)
        .expect("repaired written")
        .contains("omr:"));
    assert_eq!(
        std::fs::read_to_string(&input).expect("input kept"),
        PREFIXED_SCORE
    );
}

#[traced_test]
#[test]
fn stage_boundaries_log_at_info() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("nocturne.mxl");
    write_archive(&input, &[("nocturne.xml", PREFIXED_SCORE.as_bytes().to_vec())]);

    assert!(stub_pipeline().convert(&input).is_converted());

    logs_assert(|lines: &[&str]| {
        for stage in [
            "payload read",
            "payload decoded",
            "namespaces repaired",
            "repaired document written",
            "rendered",
        ] {
            if !lines
                .iter()
                .any(|line| line.contains(" INFO ") && line.contains(stage))
            {
                return Err(format!("no info line for {stage}"));
            }
        }
        Ok(())
    });
}
