//! End-to-end pipeline tests against real FFmpeg.

use stillclip_media::{probe_media, FfmpegRunner, FramePreparer, Stage};
use stillclip_models::{
    ErrorKind, PipelineConfig, PipelineRequest, PipelineResult, StageKind, UploadedFile,
};

use super::support::{
    first_frame, media_tools_available, near, request, upload, write_gated_tone_video,
    write_image, Workspace, RED,
};

const BLACK: image::Rgb<u8> = image::Rgb([0, 0, 0]);

/// Square image, 10 s video with sound over 2-8 s.
#[tokio::test]
async fn test_gated_tone_becomes_six_second_clip() {
    if !media_tools_available("test_gated_tone_becomes_six_second_clip") {
        return;
    }

    let ws = Workspace::new();
    let image = ws.path("cover.png");
    write_image(&image, 500, 500, RED);
    let video = write_gated_tone_video(ws.root(), "talk").await;

    let pipeline = ws.pipeline(PipelineConfig::default());
    let result = pipeline.run(&request(&image, &video, "scenario one")).await;

    let PipelineResult::Delivered {
        output_path,
        bounds,
        degraded,
    } = result
    else {
        panic!("expected delivery, got {:?}", result);
    };

    assert_eq!(output_path, ws.output_dir().join("scenario_one.mp4"));
    assert!(!degraded);
    assert!(bounds.start_ms().abs_diff(2_000) <= 20, "start {}", bounds.start_ms());
    assert!(bounds.end_ms().abs_diff(8_000) <= 20, "end {}", bounds.end_ms());

    let info = probe_media(&output_path).await.expect("Failed to probe clip");
    let video_stream = info.video.expect("clip has no video stream");
    assert_eq!((video_stream.width, video_stream.height), (1080, 1920));

    let audio = info.audio.expect("clip has no audio stream");
    assert_eq!(audio.sample_rate, 48_000);
    let audio_secs = audio.duration.unwrap_or(info.duration);
    assert!((audio_secs - 6.0).abs() <= 0.05, "audio lasts {} s", audio_secs);

    // 500x500 scales to 1080x1080 with 420 px bands above and below
    let frame = first_frame(&output_path, ws.root()).await;
    assert!(near(frame.get_pixel(540, 100), BLACK, 24));
    assert!(near(frame.get_pixel(540, 960), RED, 24));

    assert_eq!(ws.leftover_artifacts(), 0);
}

#[tokio::test]
async fn test_empty_video_fails_without_output() {
    let ws = Workspace::new();
    let image = ws.path("cover.png");
    write_image(&image, 64, 64, RED);

    let request = PipelineRequest::new(
        upload(&image),
        UploadedFile::new("talk.mp4", Vec::new()),
        "empty",
    );
    let result = ws.pipeline(PipelineConfig::default()).run(&request).await;

    assert_eq!(result.error_kind(), Some(ErrorKind::InputError));
    assert!(!ws.output_dir().join("empty.mp4").exists());
    assert_eq!(ws.leftover_artifacts(), 0);
}

/// Portrait image fills the canvas height with bars left and right.
#[tokio::test]
async fn test_portrait_image_is_pillarboxed() {
    if !media_tools_available("test_portrait_image_is_pillarboxed") {
        return;
    }

    let ws = Workspace::new();
    let image = ws.path("portrait.png");
    write_image(&image, 500, 1000, RED);

    // Frame stage alone, lossless
    let frame_path = ws.path("frame.png");
    let stage = FramePreparer::new(FfmpegRunner::new(), &PipelineConfig::default());
    stage
        .execute(&[image.as_path()], &frame_path)
        .await
        .expect("Frame preparation failed");

    let frame = image::open(&frame_path).expect("Failed to decode frame").to_rgba8();
    assert_eq!(frame.dimensions(), (1080, 1920));
    // 500x1000 scales to 960x1920, leaving 60 px on each side
    assert_eq!(&frame.get_pixel(10, 960).0[..3], &[0, 0, 0]);
    assert_eq!(&frame.get_pixel(1070, 960).0[..3], &[0, 0, 0]);
    let center = frame.get_pixel(540, 960).0;
    assert!(center[0].abs_diff(RED.0[0]) <= 2 && center[1].abs_diff(RED.0[1]) <= 2);
    let top = frame.get_pixel(540, 0).0;
    assert!(top[0].abs_diff(RED.0[0]) <= 2, "top row should be image, got {:?}", top);

    // And the same geometry survives the whole pipeline
    let video = write_gated_tone_video(ws.root(), "talk").await;
    let result = ws
        .pipeline(PipelineConfig::default())
        .run(&request(&image, &video, "portrait"))
        .await;
    let output = result.output_path().expect("pipeline failed").to_path_buf();

    let frame = first_frame(&output, ws.root()).await;
    assert!(near(frame.get_pixel(10, 960), BLACK, 24));
    assert!(near(frame.get_pixel(540, 960), RED, 24));
    assert!(near(frame.get_pixel(540, 4), RED, 24));
}

/// An unusable loudness target must degrade, not fail.
#[tokio::test]
async fn test_loudness_failure_falls_back_to_plain_encode() {
    if !media_tools_available("test_loudness_failure_falls_back_to_plain_encode") {
        return;
    }

    let ws = Workspace::new();
    let image = ws.path("cover.png");
    write_image(&image, 320, 320, RED);
    let video = write_gated_tone_video(ws.root(), "talk").await;

    let config = PipelineConfig::default().with_loudness_target_lufs(-200.0);
    let result = ws.pipeline(config).run(&request(&image, &video, "fallback")).await;

    assert!(
        matches!(result, PipelineResult::Delivered { degraded: true, .. }),
        "got {:?}",
        result
    );
    assert!(ws.output_dir().join("fallback.mp4").exists());
    assert_eq!(ws.leftover_artifacts(), 0);
}

#[tokio::test]
async fn test_repeated_runs_detect_same_bounds() {
    if !media_tools_available("test_repeated_runs_detect_same_bounds") {
        return;
    }

    let ws = Workspace::new();
    let image = ws.path("cover.png");
    write_image(&image, 200, 400, RED);
    let video = write_gated_tone_video(ws.root(), "talk").await;
    let pipeline = ws.pipeline(PipelineConfig::default());

    let first = pipeline.run(&request(&image, &video, "again")).await;
    let second = pipeline.run(&request(&image, &video, "again")).await;

    match (first, second) {
        (
            PipelineResult::Delivered { bounds: a, .. },
            PipelineResult::Delivered { bounds: b, .. },
        ) => assert_eq!(a, b),
        other => panic!("expected two deliveries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_video_is_stage_failure() {
    if !media_tools_available("test_undecodable_video_is_stage_failure") {
        return;
    }

    let ws = Workspace::new();
    let image = ws.path("cover.png");
    write_image(&image, 64, 64, RED);
    let video = ws.path("garbage.mp4");
    std::fs::write(&video, b"definitely not a video container").unwrap();

    let result = ws
        .pipeline(PipelineConfig::default())
        .run(&request(&image, &video, "garbage"))
        .await;

    let PipelineResult::Failed { kind, message } = result else {
        panic!("expected failure");
    };
    assert_eq!(
        kind,
        ErrorKind::StageFailure {
            stage: StageKind::AudioExtraction
        }
    );
    assert!(message.starts_with("audio_extraction failed: "), "{}", message);
    assert!(!message.contains(&*ws.work_dir().to_string_lossy()), "{}", message);
    assert!(!ws.output_dir().join("garbage.mp4").exists());
    assert_eq!(ws.leftover_artifacts(), 0);
}
