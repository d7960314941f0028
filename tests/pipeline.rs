//! End-to-end pipeline behaviour against real files

use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageBuffer, Rgb};
use resize_images::{discover_sources, parse_sizes, Pipeline, ProcessingConfig};
use tempfile::TempDir;
use tokio::sync::watch;

fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    DynamicImage::ImageRgb8(img).save(dir.join(name)).unwrap();
}

fn output_names(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn dimensions(path: &Path) -> (u32, u32) {
    let img = image::open(path).unwrap();
    (img.width(), img.height())
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

async fn run(src: &Path, dst: &Path, sizes: &str, processing: &ProcessingConfig) -> resize_images::BatchSummary {
    let sources = discover_sources(src).await.unwrap();
    Pipeline::new(dst, parse_sizes(sizes).unwrap(), processing)
        .run(sources)
        .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_source_gets_every_size() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_jpeg(src.path(), "a.jpg", 100, 200);
    write_jpeg(src.path(), "b.jpg", 300, 300);

    let summary = run(src.path(), dst.path(), "50,100", &ProcessingConfig::default()).await;

    assert_eq!(
        output_names(dst.path()),
        names(&["a_50.jpg", "a_100.jpg", "b_50.jpg", "b_100.jpg"])
    );
    assert_eq!(dimensions(&dst.path().join("a_50.jpg")), (25, 50));
    assert_eq!(dimensions(&dst.path().join("a_100.jpg")), (50, 100));
    assert_eq!(dimensions(&dst.path().join("b_50.jpg")), (50, 50));
    assert_eq!(dimensions(&dst.path().join("b_100.jpg")), (100, 100));

    assert_eq!(summary.sources, 2);
    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.tasks, 4);
    assert_eq!(summary.written, 4);
    assert_eq!(summary.failures(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_undecodable_source_is_skipped() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_jpeg(src.path(), "good.jpg", 64, 32);
    write_jpeg(src.path(), "other.jpg", 20, 40);
    std::fs::write(src.path().join("broken.jpg"), b"this is not a jpeg").unwrap();

    let summary = run(src.path(), dst.path(), "16,8,4", &ProcessingConfig::default()).await;

    let outputs = output_names(dst.path());
    assert_eq!(outputs.len(), 6);
    assert!(outputs.iter().all(|name| !name.starts_with("broken")));
    assert_eq!(summary.load_failed, 1);
    assert_eq!(summary.tasks, 6);
    assert_eq!(summary.written, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_write_does_not_block_others() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_jpeg(src.path(), "a.jpg", 100, 200);
    write_jpeg(src.path(), "b.jpg", 300, 300);
    // A directory squatting on an output path makes that one create fail
    std::fs::create_dir(dst.path().join("a_50.jpg")).unwrap();

    let summary = run(src.path(), dst.path(), "50,100", &ProcessingConfig::default()).await;

    assert!(dst.path().join("a_50.jpg").is_dir());
    for name in ["a_100.jpg", "b_50.jpg", "b_100.jpg"] {
        assert!(dst.path().join(name).is_file(), "{} missing", name);
    }
    assert_eq!(summary.tasks, 4);
    assert_eq!(summary.written, 3);
    assert_eq!(summary.write_failed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rerun_overwrites_with_same_dimensions() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_jpeg(src.path(), "wide.jpg", 400, 100);

    run(src.path(), dst.path(), "200,40", &ProcessingConfig::default()).await;
    let first = output_names(dst.path());
    let first_dims = dimensions(&dst.path().join("wide_40.jpg"));

    let summary = run(src.path(), dst.path(), "200,40", &ProcessingConfig::default()).await;

    assert_eq!(output_names(dst.path()), first);
    assert_eq!(dimensions(&dst.path().join("wide_40.jpg")), first_dims);
    assert_eq!(first_dims, (40, 10));
    assert_eq!(dimensions(&dst.path().join("wide_200.jpg")), (200, 50));
    assert_eq!(summary.written, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_size_is_skipped_without_a_file() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_jpeg(src.path(), "a.jpg", 30, 30);

    let summary = run(src.path(), dst.path(), "0,10", &ProcessingConfig::default()).await;

    assert_eq!(output_names(dst.path()), names(&["a_10.jpg"]));
    assert_eq!(summary.tasks, 2);
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped_zero, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_permit_pool_still_finishes() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    for i in 0..6 {
        write_jpeg(src.path(), &format!("img{}.jpg", i), 40 + i, 30);
    }
    let processing = ProcessingConfig {
        threads: Some(1),
        channel_capacity: Some(1),
        ..Default::default()
    };

    let summary = run(src.path(), dst.path(), "8,16,24", &processing).await;

    assert_eq!(output_names(dst.path()).len(), 18);
    assert_eq!(summary.written, 18);
}

#[tokio::test]
async fn test_current_thread_runtime() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_jpeg(src.path(), "tall.jpg", 10, 50);

    let summary = run(src.path(), dst.path(), "25", &ProcessingConfig::default()).await;

    assert_eq!(dimensions(&dst.path().join("tall_25.jpg")), (5, 25));
    assert_eq!(summary.written, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_duplicate_sizes_share_one_file() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_jpeg(src.path(), "a.jpg", 60, 60);

    let summary = run(src.path(), dst.path(), "20,20", &ProcessingConfig::default()).await;

    assert_eq!(output_names(dst.path()), names(&["a_20.jpg"]));
    assert_eq!(dimensions(&dst.path().join("a_20.jpg")), (20, 20));
    assert_eq!(summary.tasks, 2);
    assert_eq!(summary.written, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sources_with_colliding_names_run_once() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_jpeg(src.path(), "a.jpg", 100, 200);
    write_jpeg(src.path(), "a.jpeg", 300, 300);
    write_jpeg(src.path(), "a.JPG", 40, 10);
    write_jpeg(src.path(), "b.jpg", 300, 300);

    let summary = run(src.path(), dst.path(), "50,100", &ProcessingConfig::default()).await;

    assert_eq!(
        output_names(dst.path()),
        names(&["a_50.jpg", "a_100.jpg", "b_50.jpg", "b_100.jpg"])
    );
    // Only a.JPG, the first in sorted order, is resized
    assert_eq!(dimensions(&dst.path().join("a_50.jpg")), (40, 10));
    assert_eq!(dimensions(&dst.path().join("a_100.jpg")), (40, 10));
    assert_eq!(summary.sources, 2);
    assert_eq!(summary.tasks, 4);
    assert_eq!(summary.written, 4);
}

/// Shared buffer the test subscriber writes formatted events into
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Current-thread runtime so every task logs through the thread-local subscriber
#[tokio::test]
async fn test_resizes_start_before_all_sources_are_decoded() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    for i in 0..20 {
        write_jpeg(src.path(), &format!("img{:02}.jpg", i), 400, 300);
    }

    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let processing = ProcessingConfig {
        threads: Some(2),
        ..Default::default()
    };
    let summary = run(src.path(), dst.path(), "16", &processing).await;
    assert_eq!(summary.written, 20);

    let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<&str> = logs.lines().collect();
    let first_create = lines
        .iter()
        .position(|line| line.contains("creating"))
        .unwrap();
    let reads_before = lines[..first_create]
        .iter()
        .filter(|line| line.contains("reading"))
        .count();
    let reads_total = lines.iter().filter(|line| line.contains("reading")).count();

    assert_eq!(reads_total, 20);
    assert!(reads_before <= 2, "{} sources read before the first resize", reads_before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_batch_still_completes() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write_jpeg(src.path(), "a.jpg", 60, 60);
    write_jpeg(src.path(), "b.jpg", 60, 60);

    let (cancel_tx, cancel_rx) = watch::channel(true);
    let sources = discover_sources(src.path()).await.unwrap();
    let summary = Pipeline::new(dst.path(), parse_sizes("10").unwrap(), &ProcessingConfig::default())
        .with_cancellation(cancel_rx)
        .run(sources)
        .await;
    drop(cancel_tx);

    assert!(output_names(dst.path()).is_empty());
    assert_eq!(summary.cancelled, 2);
    assert_eq!(summary.tasks, 0);
}
