// 该文件是 Yinyi （译音） 项目的一部分。
// tests/pipeline.rs - 单帧流程与单张图像任务测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod common;

use approx::assert_relative_eq;
use common::*;
use yinyi::{
  pipeline::{OnDetectionError, PipelineError},
  task::{OneShotTask, Task},
};

#[test]
fn outputs_are_aligned_in_detection_order() {
  let dir = tempfile::tempdir().unwrap();
  let detector = ScriptedDetector::fixed(vec![
    item("person", [5.0, 5.0, 40.0, 90.0]),
    item("dog", [50.0, 60.0, 90.0, 95.0]),
    item("car", [60.0, 5.0, 95.0, 30.0]),
  ]);
  let mut pipeline = pipeline(detector, PrefixTranslator::new(), dir.path());

  let output = pipeline.process(&blank_frame(100, 100), "es").unwrap();

  assert_eq!(output.detected_words, vec!["person", "dog", "car"]);
  assert_eq!(output.translated_texts, vec!["es:person", "es:dog", "es:car"]);
  assert_eq!(output.audio_files, vec!["person.mp3", "dog.mp3", "car.mp3"]);
  for name in &output.audio_files {
    assert!(dir.path().join(name).is_file());
  }
  assert_eq!(
    std::fs::read_to_string(dir.path().join("dog.mp3")).unwrap(),
    "es:dog#2"
  );
}

#[test]
fn no_detections_leaves_frame_untouched() {
  let dir = tempfile::tempdir().unwrap();
  let mut pipeline = pipeline(
    ScriptedDetector::fixed(Vec::new()),
    PrefixTranslator::new(),
    dir.path(),
  );
  let frame = blank_frame(64, 48);

  let output = pipeline.process(&frame, "hi").unwrap();

  assert!(output.is_empty());
  assert!(output.translated_texts.is_empty());
  assert!(output.audio_files.is_empty());
  assert_eq!(output.annotated.image, frame.image);
}

#[test]
fn duplicate_labels_share_one_audio_file() {
  let dir = tempfile::tempdir().unwrap();
  let detector = ScriptedDetector::fixed(vec![
    item("dog", [5.0, 30.0, 40.0, 90.0]),
    item("dog", [50.0, 30.0, 90.0, 90.0]),
  ]);
  let mut pipeline = pipeline(detector, PrefixTranslator::new(), dir.path());

  let output = pipeline.process(&blank_frame(100, 100), "de").unwrap();

  assert_eq!(output.detected_words, vec!["dog", "dog"]);
  assert_eq!(output.audio_files, vec!["dog.mp3", "dog.mp3"]);
  // 后写入的覆盖先写入的
  assert_eq!(
    std::fs::read_to_string(dir.path().join("dog.mp3")).unwrap(),
    "de:dog#2"
  );
}

#[test]
fn translation_failure_aborts_frame_by_default() {
  let dir = tempfile::tempdir().unwrap();
  let detector = ScriptedDetector::fixed(vec![
    item("cat", [5.0, 30.0, 30.0, 60.0]),
    item("bird", [35.0, 30.0, 60.0, 60.0]),
    item("dog", [65.0, 30.0, 95.0, 60.0]),
  ]);
  let mut pipeline = pipeline(detector, PrefixTranslator::failing_on("bird"), dir.path());

  let err = pipeline.process(&blank_frame(100, 100), "hi").unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Translation { index: 1, ref label, .. } if label == "bird"
  ));
  assert!(dir.path().join("cat.mp3").is_file());
  assert!(!dir.path().join("dog.mp3").exists());
}

#[test]
fn skip_policy_drops_only_failing_detection() {
  let dir = tempfile::tempdir().unwrap();
  let detector = ScriptedDetector::fixed(vec![
    item("cat", [5.0, 30.0, 30.0, 60.0]),
    item("bird", [35.0, 30.0, 60.0, 60.0]),
    item("dog", [65.0, 30.0, 95.0, 60.0]),
  ]);
  let mut pipeline = pipeline(detector, PrefixTranslator::failing_on("bird"), dir.path())
    .with_error_policy(OnDetectionError::SkipDetection);

  let output = pipeline.process(&blank_frame(100, 100), "hi").unwrap();

  assert_eq!(output.detected_words, vec!["cat", "dog"]);
  assert_eq!(output.translated_texts, vec!["hi:cat", "hi:dog"]);
  assert_eq!(output.audio_files, vec!["cat.mp3", "dog.mp3"]);
  // 跳过的检测不绘制
  assert_eq!(output.annotated.image.get_pixel(47, 59), &BACKGROUND);
  assert_eq!(output.annotated.image.get_pixel(5, 59), &GREEN);
}

#[test]
fn detector_failure_is_returned() {
  let dir = tempfile::tempdir().unwrap();
  let mut pipeline = pipeline(
    ScriptedDetector::scripted(vec![None]),
    PrefixTranslator::new(),
    dir.path(),
  )
  .with_error_policy(OnDetectionError::SkipDetection);

  let err = pipeline.process(&blank_frame(32, 32), "hi").unwrap_err();
  assert!(matches!(err, PipelineError::Detection(_)));
  assert_eq!(pipeline.sink().base(), dir.path());
}

#[test]
fn one_shot_writes_annotated_image_and_record() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("cat.png");
  blank_frame(256, 256).image.save(&input).unwrap();
  let out = dir.path().join("out");

  let detector = ScriptedDetector::fixed(vec![item("cat", [10.0, 10.0, 50.0, 50.0])]);
  let mut pipeline = pipeline(detector, PrefixTranslator::new(), &out);

  let record = OneShotTask::new(&input)
    .with_language("fr")
    .run_task(&mut pipeline)
    .unwrap();

  assert_eq!(record.filename, "annotated_cat.png");
  assert_eq!(record.detected_words, vec!["cat"]);
  assert_eq!(record.translated_texts, vec!["fr:cat"]);
  assert_eq!(record.audio_files, vec!["cat.mp3"]);
  let elapsed = record.processing_time.unwrap();
  assert!(elapsed >= 0.0);
  assert_relative_eq!(elapsed, (elapsed * 100.0).round() / 100.0);

  let saved: yinyi::output::ResultRecord =
    serde_json::from_slice(&std::fs::read(out.join("result_cat.json")).unwrap()).unwrap();
  assert_eq!(saved, record);

  let annotated = image::open(out.join("annotated_cat.png")).unwrap().to_rgb8();
  assert_eq!(annotated.dimensions(), (256, 256));
  assert_eq!(annotated.get_pixel(10, 10), &GREEN);
  assert_eq!(annotated.get_pixel(50, 50), &GREEN);
  assert_eq!(annotated.get_pixel(10, 45), &GREEN);
  assert_eq!(annotated.get_pixel(30, 45), &BACKGROUND);
  assert_eq!(annotated.get_pixel(200, 200), &BACKGROUND);
}

#[test]
fn one_shot_resizes_to_processing_resolution() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("street.png");
  blank_frame(640, 480).image.save(&input).unwrap();

  let mut pipeline = pipeline(
    ScriptedDetector::fixed(Vec::new()),
    PrefixTranslator::new(),
    dir.path(),
  );
  let record = OneShotTask::new(&input).run_task(&mut pipeline).unwrap();

  assert!(record.is_empty());
  let annotated = image::open(dir.path().join("annotated_street.png")).unwrap();
  assert_eq!((annotated.width(), annotated.height()), (256, 256));
  assert!(dir.path().join("result_street.json").is_file());
}

#[test]
fn one_shot_failure_writes_no_record() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("pets.png");
  blank_frame(256, 256).image.save(&input).unwrap();

  let detector = ScriptedDetector::fixed(vec![
    item("cat", [5.0, 30.0, 30.0, 60.0]),
    item("bird", [35.0, 30.0, 60.0, 60.0]),
    item("dog", [65.0, 30.0, 95.0, 60.0]),
  ]);
  let mut pipeline = pipeline(detector, PrefixTranslator::failing_on("bird"), dir.path());

  assert!(OneShotTask::new(&input).run_task(&mut pipeline).is_err());
  assert!(!dir.path().join("result_pets.json").exists());
  assert!(!dir.path().join("annotated_pets.png").exists());
  // 失败前写出的音频保留
  assert!(dir.path().join("cat.mp3").is_file());
}

#[test]
fn one_shot_missing_image_is_an_error() {
  let dir = tempfile::tempdir().unwrap();
  let mut pipeline = pipeline(
    ScriptedDetector::fixed(Vec::new()),
    PrefixTranslator::new(),
    dir.path(),
  );

  let err = OneShotTask::new(dir.path().join("missing.jpg"))
    .run_task(&mut pipeline)
    .unwrap_err();
  assert!(format!("{:#}", err).contains("missing.jpg"));
  assert_eq!(pipeline.sink().base(), dir.path());
}

#[test]
fn synthesis_failure_aborts_frame_by_default() {
  let dir = tempfile::tempdir().unwrap();
  let detector = ScriptedDetector::fixed(vec![
    item("cat", [5.0, 30.0, 30.0, 60.0]),
    item("bird", [35.0, 30.0, 60.0, 60.0]),
    item("dog", [65.0, 30.0, 95.0, 60.0]),
  ]);
  let mut pipeline = pipeline_with(
    detector,
    PrefixTranslator::new(),
    RecordingSynthesizer::failing_on("hi:bird"),
    dir.path(),
  );

  let err = pipeline.process(&blank_frame(100, 100), "hi").unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Synthesis { index: 1, ref label, .. } if label == "bird"
  ));
  assert!(dir.path().join("cat.mp3").is_file());
  assert!(!dir.path().join("bird.mp3").exists());
  assert!(!dir.path().join("dog.mp3").exists());
}

#[test]
fn skip_policy_drops_detection_when_synthesis_fails() {
  let dir = tempfile::tempdir().unwrap();
  let detector = ScriptedDetector::fixed(vec![
    item("cat", [5.0, 30.0, 30.0, 60.0]),
    item("bird", [35.0, 30.0, 60.0, 60.0]),
    item("dog", [65.0, 30.0, 95.0, 60.0]),
  ]);
  let mut pipeline = pipeline_with(
    detector,
    PrefixTranslator::new(),
    RecordingSynthesizer::failing_on("hi:bird"),
    dir.path(),
  )
  .with_error_policy(OnDetectionError::SkipDetection);

  let output = pipeline.process(&blank_frame(100, 100), "hi").unwrap();

  assert_eq!(output.detected_words, vec!["cat", "dog"]);
  assert_eq!(output.translated_texts, vec!["hi:cat", "hi:dog"]);
  assert_eq!(output.audio_files, vec!["cat.mp3", "dog.mp3"]);
  assert_eq!(output.annotated.image.get_pixel(47, 59), &BACKGROUND);
  assert!(dir.path().join("dog.mp3").is_file());
}

#[test]
fn one_shot_survives_unwritable_output() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("empty.png");
  blank_frame(256, 256).image.save(&input).unwrap();
  // 输出目录位置被普通文件占用
  let blocked = dir.path().join("blocked");
  std::fs::write(&blocked, b"not a directory").unwrap();

  let mut pipeline = pipeline(
    ScriptedDetector::fixed(Vec::new()),
    PrefixTranslator::new(),
    &blocked,
  );
  let record = OneShotTask::new(&input).run_task(&mut pipeline).unwrap();

  assert_eq!(record.filename, "annotated_empty.png");
  assert!(record.is_empty());
  assert!(record.processing_time.is_some());
  assert!(blocked.is_file());
}
