//! End-to-end runs over generated CSV files.

use chrono::NaiveDate;
use lendbench::backends::{open, Backend, BackendKind};
use lendbench::dataset::generator::{generate, GeneratorConfig};
use lendbench::dataset::subsets::create_subsets;
use lendbench::dataset::{DatasetFiles, DatasetSize};
use lendbench::query::QueryId;
use lendbench::report::{append_csv, first_time_chart, read_csv};
use lendbench::runner::{matching_names, run_suite};
use lendbench::AdapterConfig;
use tempfile::tempdir;

fn write_dataset(dir: &std::path::Path) {
    let data = generate(
        &GeneratorConfig::new(120, 80, 400)
            .with_seed(5)
            .with_reference_date(NaiveDate::from_ymd_opt(2023, 9, 1).unwrap()),
    );
    data.write(&DatasetFiles::base(dir)).unwrap();
    create_subsets(dir).unwrap();
}

#[test]
fn test_in_process_backends_agree_on_every_size() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path());

    for size in DatasetSize::ALL {
        let config = AdapterConfig::default()
            .with_data_dir(dir.path())
            .with_dataset_size(size)
            .with_name_pattern("a");
        let params = config.query_params();

        let mut sqlite = open(BackendKind::Sqlite, &config).unwrap();
        let mut memory = open(BackendKind::Memory, &config).unwrap();
        let loaded = sqlite.load_dataset(&config).unwrap();
        assert_eq!(memory.load_dataset(&config).unwrap(), loaded);

        for query in QueryId::ALL {
            let expected = sqlite.run_query(query, &params).unwrap().normalized();
            let actual = memory.run_query(query, &params).unwrap().normalized();
            assert_eq!(actual, expected, "{} differs at {}", query, size);
        }
    }
}

#[test]
fn test_full_subset_matches_base_files() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path());

    let config = AdapterConfig::default()
        .with_data_dir(dir.path())
        .with_dataset_size(DatasetSize::K1000);
    let mut sqlite = open(BackendKind::Sqlite, &config).unwrap();
    let summary = sqlite.load_dataset(&config).unwrap();

    assert_eq!(summary.books, 120);
    assert_eq!(summary.borrowers, 80);
    assert_eq!(summary.transactions, 400);
}

#[test]
fn test_results_accumulate_across_runs() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path());
    let results = dir.path().join("query_results.csv");

    for (kind, size) in [
        (BackendKind::Sqlite, DatasetSize::K250),
        (BackendKind::Memory, DatasetSize::K250),
        (BackendKind::Sqlite, DatasetSize::K750),
    ] {
        let config = AdapterConfig::for_backend(kind)
            .with_data_dir(dir.path())
            .with_dataset_size(size)
            .with_name_pattern("m");
        let mut backend = open(kind, &config).unwrap();
        backend.load_dataset(&config).unwrap();

        let rows = run_suite(backend.as_mut(), &config, &QueryId::ALL, 3).unwrap();
        append_csv(&results, &rows).unwrap();

        let names = matching_names(backend.as_mut(), &config.query_params()).unwrap();
        assert!(names.iter().all(|n| n.to_lowercase().starts_with('m')));
    }

    let rows = read_csv(&results).unwrap();
    assert_eq!(rows.len(), 12);
    assert_eq!(rows.iter().filter(|r| r.database == "SQLite").count(), 8);

    let chart = first_time_chart(&rows, "SQLite");
    assert!(chart.contains("250k"));
    assert!(chart.contains("750k"));
    assert!(!chart.contains("500k"));
}

#[test]
fn test_missing_subset_is_reported() {
    let dir = tempdir().unwrap();
    let config = AdapterConfig::default().with_data_dir(dir.path());
    let mut sqlite = open(BackendKind::Sqlite, &config).unwrap();

    let err = sqlite.load_dataset(&config).unwrap_err();
    assert!(err.to_string().contains("books_25.csv"));
}
