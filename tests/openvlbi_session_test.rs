use std::io::Write;

use camino::Utf8PathBuf;
use vlbi::file_format::{FileFormat, RawFormat};
use vlbi::nodes::NodeFilter;
use vlbi::openvlbi::{OpenVlbi, PlotFlags};
use vlbi::stream::{Location, SampleStream};
use vlbi::synthesis::{EngineConfig, PlotParams};
use vlbi::vlbi_errors::VlbiError;

mod common;
use common::f64_bytes;

const START: &str = "2024/06/01 00:00:00";

fn session() -> OpenVlbi {
    common::init_tracing();
    let mut vlbi = OpenVlbi::new(EngineConfig::new(2));
    vlbi.add_context("session").unwrap();
    vlbi.set_bits_per_sample(-64).unwrap();
    vlbi.set_sample_rate(1.0 / 60.0).unwrap();
    vlbi.set_frequency(3e7).unwrap();
    vlbi.set_resolution(32, 32).unwrap();
    vlbi.set_target(0.0, 45.0, 0.0);
    vlbi
}

fn add_station(vlbi: &mut OpenVlbi, name: &str, lon: f64) {
    let bytes = f64_bytes(&[1.0; 1_440]);
    let location = Location::geographic(45.0, lon, 0.0).unwrap();
    vlbi.add_node_raw(name, location, &bytes, START).unwrap();
}

#[test]
fn test_plot_and_export_model() {
    let mut vlbi = session();
    add_station(&mut vlbi, "west", 7.0);
    add_station(&mut vlbi, "east", 7.001);
    add_station(&mut vlbi, "south", 7.0005);

    let baselines = vlbi.list_baselines().unwrap();
    assert_eq!(baselines.len(), 3);

    let outcome = vlbi
        .plot("coverage", PlotFlags {
            coverage: true,
            synced: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(outcome.baselines, 3);
    assert!(!outcome.interrupted);

    let bytes = vlbi.get_model("coverage", "raw").unwrap();
    let model = RawFormat.decode_stream(&bytes).unwrap();
    assert_eq!(model.shape(), &[32, 32]);

    vlbi.dft_model("coverage", "mag", "phase").unwrap();
    vlbi.idft_model("mag", "phase", "back").unwrap();
    assert_eq!(
        vlbi.list_models().unwrap(),
        vec!["coverage", "mag", "phase", "back"]
    );
}

#[test]
fn test_contexts_are_isolated() {
    let mut vlbi = session();
    add_station(&mut vlbi, "a", 7.0);

    vlbi.add_context("other").unwrap();
    assert!(vlbi.list_nodes().unwrap().is_empty());

    vlbi.select_context("session").unwrap();
    assert_eq!(vlbi.list_nodes().unwrap().len(), 1);

    vlbi.delete_context("session");
    assert_eq!(vlbi.list_contexts(), vec!["other"]);
    assert!(matches!(
        vlbi.list_nodes(),
        Err(VlbiError::ContextNotFound(_))
    ));
    assert_eq!(
        vlbi.select_context("session"),
        Err(VlbiError::ContextNotFound("session".into()))
    );
}

#[test]
fn test_node_copies_and_filters() {
    let mut vlbi = session();
    add_station(&mut vlbi, "a", 7.0);

    vlbi.copy_node("a", "b").unwrap();
    vlbi.filter_node("a", "lp", NodeFilter::LowPass(0.001)).unwrap();
    let names: Vec<String> = vlbi.list_nodes().unwrap().into_iter().map(|n| n.name).collect();
    assert_eq!(names, vec!["a", "b", "lp"]);

    assert!(matches!(
        vlbi.copy_node("missing", "c"),
        Err(VlbiError::NodeNotFound(_))
    ));
    assert!(matches!(
        vlbi.copy_node("a", "b"),
        Err(VlbiError::DuplicateName(_))
    ));

    vlbi.delete_node("b").unwrap();
    vlbi.delete_node("b").unwrap();
    assert_eq!(vlbi.list_nodes().unwrap().len(), 2);
}

#[test]
fn test_failed_lock_keeps_baseline_unlocked() {
    let mut vlbi = session();
    add_station(&mut vlbi, "a", 7.0);
    add_station(&mut vlbi, "b", 7.001);

    assert!(vlbi.lock_baseline("a_b", "raw", &[1, 2, 3]).is_err());
    assert!(!vlbi.list_baselines().unwrap()[0].locked);

    let correlated = SampleStream::from_samples(vec![0.5; 10]);
    let bytes = RawFormat.encode_model(&correlated).unwrap();
    assert_eq!(
        vlbi.lock_baseline("a_c", "raw", &bytes),
        Err(VlbiError::BaselineNotFound("a_c".into()))
    );
    vlbi.lock_baseline("a_b", "raw", &bytes).unwrap();
    assert!(vlbi.list_baselines().unwrap()[0].locked);

    vlbi.unlock_baseline("a_b").unwrap();
    assert!(!vlbi.list_baselines().unwrap()[0].locked);
}

#[test]
fn test_node_from_path_uses_extension() {
    let mut vlbi = session();
    let dir = std::env::temp_dir().join(format!("vlbi-session-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let dir = Utf8PathBuf::from_path_buf(dir).unwrap();

    let stream = SampleStream::from_samples(vec![1.0, 2.0, 3.0]);
    let raw_path = dir.join("node.raw");
    std::fs::File::create(&raw_path)
        .unwrap()
        .write_all(&RawFormat.encode_model(&stream).unwrap())
        .unwrap();
    assert_eq!(vlbi.add_node_from_path("disk", &raw_path).unwrap(), "disk");

    let fits_path = dir.join("node.fits");
    std::fs::write(&fits_path, b"SIMPLE").unwrap();
    assert_eq!(
        vlbi.add_node_from_path("other", &fits_path),
        Err(VlbiError::UnsupportedFormat("fits".into()))
    );
    assert!(matches!(
        vlbi.add_node_from_path("missing", &dir.join("absent.raw")),
        Err(VlbiError::Io(_))
    ));
    assert_eq!(vlbi.list_nodes().unwrap().len(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_plot_with_preset_interrupt() {
    let mut vlbi = session();
    add_station(&mut vlbi, "a", 7.0);
    add_station(&mut vlbi, "b", 7.001);

    let flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let params = PlotParams::builder()
        .sample_rate(1.0)
        .resolution(8, 8)
        .interrupt(flag)
        .build()
        .unwrap();
    let outcome = vlbi.plot_with("stopped", &params).unwrap();
    assert!(outcome.interrupted);
    assert_eq!(outcome.steps, 0);
    assert_eq!(vlbi.list_models().unwrap(), vec!["stopped"]);
}
