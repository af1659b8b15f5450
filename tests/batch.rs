use std::fs::File;
use std::path::{Path, PathBuf};

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use spectral_features::batch::{collect_inputs, process_paths, select_batch};
use spectral_features::data::fits::{write_fits, FitsHeader};
use spectral_features::data::model::HeaderValue;
use spectral_features::output::write_table;
use spectral_features::{ExtractorConfig, FeatureExtractor};

const COEFF0: f64 = 3.5682;
const COEFF1: f64 = 1e-4;
const SAMPLES: usize = 3000;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("spectral-features-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_spectrum(dir: &Path, index: usize) -> PathBuf {
    let filename = format!("spec-{index:02}.fits");
    let mut header = FitsHeader::new();
    header.set("FILENAME", HeaderValue::String(filename.clone()));
    header.set("CLASS", HeaderValue::String("STAR".into()));
    header.set("DESIG", HeaderValue::String(format!("LAMOST J0000{index:02}.00+100000.0")));
    header.set("COEFF0", HeaderValue::Float(COEFF0));
    header.set("COEFF1", HeaderValue::Float(COEFF1));
    header.set("SN_G", HeaderValue::Float(20.0 + index as f64));

    let level = 100.0 + 10.0 * index as f64;
    let flux: Vec<f64> = (0..SAMPLES)
        .map(|i| level + ((i * (index + 3)) % 17) as f64)
        .collect();

    let path = dir.join(filename);
    write_fits(&path, &header, &[SAMPLES, 1], &flux).unwrap();
    path
}

/// Ten inputs: eight good spectra and two broken ones at positions 3 and 7.
fn mixed_inputs(dir: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut paths = Vec::new();
    let mut broken = Vec::new();
    for index in 0..10 {
        let path = match index {
            3 => {
                let p = dir.join("spec-03.fits");
                std::fs::write(&p, b"garbage, not FITS").unwrap();
                broken.push(p.clone());
                p
            }
            7 => {
                let p = dir.join("spec-07.fits");
                let mut header = FitsHeader::new();
                header.set("FILENAME", HeaderValue::String("spec-07.fits".into()));
                header.set("CLASS", HeaderValue::String("STAR".into()));
                header.set("DESIG", HeaderValue::String("LAMOST J000007.00+100000.0".into()));
                header.set("COEFF1", HeaderValue::Float(COEFF1));
                write_fits(&p, &header, &[8], &[1.0; 8]).unwrap();
                broken.push(p.clone());
                p
            }
            i => write_spectrum(dir, i),
        };
        paths.push(path);
    }
    (paths, broken)
}

fn filenames(report: &spectral_features::batch::BatchReport) -> Vec<String> {
    report
        .table
        .rows
        .iter()
        .map(|r| r.metadata.filename.clone())
        .collect()
}

#[test]
fn test_two_malformed_of_ten() {
    let dir = temp_dir("batch-mixed");
    let (paths, broken) = mixed_inputs(&dir);

    let report = process_paths(&paths, &FeatureExtractor::default(), 1).unwrap();
    assert_eq!(report.table.len(), 8);
    assert_eq!(report.failures.len(), 2);

    let failed: Vec<&PathBuf> = report.failures.iter().map(|f| &f.path).collect();
    assert_eq!(failed, broken.iter().collect::<Vec<_>>());
    assert!(report.failures[1].error.contains("COEFF0"));

    let names = filenames(&report);
    assert_eq!(names[0], "spec-00.fits");
    assert!(!names.contains(&"spec-03.fits".to_string()));
    assert_eq!(report.table.rows[0].metadata.designation, "J000000.00+100000.0");
    assert_eq!(report.table.rows[0].metadata.snr.get("SN_G"), Some(&20.0));
    assert_eq!(report.table.rows[0].get("SN_G"), Some(20.0));
    assert_eq!(report.table.rows[0].get("SN_U"), Some(0.0));
    assert!(report.table.rows[0].get("totalCounts").unwrap() > 100.0 * SAMPLES as f64 * 0.9);
}

/// A FITS header claiming an array far larger than memory or `usize`.
fn write_oversized(dir: &Path, name: &str, naxis1: &str, naxis2: &str) -> PathBuf {
    let cards = [
        "SIMPLE  =                    T".to_string(),
        "BITPIX  =                  -64".to_string(),
        "NAXIS   =                    2".to_string(),
        format!("NAXIS1  = {naxis1:>20}"),
        format!("NAXIS2  = {naxis2:>20}"),
        "END".to_string(),
    ];
    let mut bytes: Vec<u8> = cards.iter().flat_map(|c| format!("{c:<80}").into_bytes()).collect();
    bytes.resize(2880, b' ');
    bytes.extend_from_slice(&[0u8; 2880]);

    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_oversized_headers_do_not_stop_the_batch() {
    let dir = temp_dir("batch-oversized");
    let paths = vec![
        write_spectrum(&dir, 0),
        write_oversized(&dir, "spec-overflow.fits", "4294967296", "4294967296"),
        write_oversized(&dir, "spec-huge.fits", "10000000000000", "1"),
        dir.join("spec-missing.fits"),
        write_spectrum(&dir, 1),
    ];

    let report = process_paths(&paths, &FeatureExtractor::default(), 2).unwrap();
    assert_eq!(filenames(&report), ["spec-00.fits", "spec-01.fits"]);
    let failed: Vec<&PathBuf> = report.failures.iter().map(|f| &f.path).collect();
    assert_eq!(failed, [&paths[1], &paths[2], &paths[3]]);
}

#[test]
fn test_parallel_keeps_input_order() {
    let dir = temp_dir("batch-parallel");
    let (paths, _) = mixed_inputs(&dir);
    let extractor = FeatureExtractor::default();

    let sequential = process_paths(&paths, &extractor, 1).unwrap();
    let parallel = process_paths(&paths, &extractor, 4).unwrap();

    assert_eq!(filenames(&sequential), filenames(&parallel));
    assert_eq!(sequential.failures, parallel.failures);
    for (a, b) in sequential.table.rows.iter().zip(&parallel.table.rows) {
        assert_eq!(a.dense(), b.dense());
    }
}

#[test]
fn test_directory_input_and_csv_output() {
    let dir = temp_dir("batch-csv");
    let data = dir.join("spectra");
    std::fs::create_dir_all(&data).unwrap();
    mixed_inputs(&data);
    std::fs::write(data.join("README.txt"), b"not a spectrum").unwrap();

    let paths = collect_inputs(&[data]).unwrap();
    assert_eq!(paths.len(), 10);

    let extractor = FeatureExtractor::default();
    let report = process_paths(&paths, &extractor, 2).unwrap();
    let output = dir.join("features.csv");
    write_table(&report.table, &output).unwrap();

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers = reader.headers().unwrap().clone();
    let expected: Vec<String> = extractor
        .column_names()
        .into_iter()
        .chain(["FILENAME", "designation", "CLASS"].map(String::from))
        .collect();
    assert_eq!(headers.iter().collect::<Vec<_>>(), expected);

    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 8);
    for record in &records {
        assert_eq!(record.len(), expected.len());
        assert_eq!(&record[expected.len() - 1], "STAR");
        for cell in record.iter().take(expected.len() - 3) {
            let value: f64 = cell.parse().unwrap();
            assert!(value.is_finite());
        }
    }
}

#[test]
fn test_parquet_output() {
    let dir = temp_dir("batch-parquet");
    let (paths, _) = mixed_inputs(&dir);
    let report = process_paths(&paths, &FeatureExtractor::default(), 1).unwrap();

    let output = dir.join("features.parquet");
    write_table(&report.table, &output).unwrap();

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&output).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 8);
    assert_eq!(batches[0].num_columns(), report.table.headers().len());
}

#[test]
fn test_config_driven_batch_slice() {
    let dir = temp_dir("batch-config");
    let (paths, _) = mixed_inputs(&dir);

    let config: ExtractorConfig = serde_json::from_str(
        r#"{ "features": [ {"name": "cB", "low": 3980, "high": 4920},
                           {"name": "cV", "low": 5070, "high": 5950} ],
             "colour_indices": [["cB", "cV"]] }"#,
    )
    .unwrap();
    let extractor = FeatureExtractor::from_config(&config).unwrap();
    assert_eq!(
        extractor.column_names(),
        [
            "cB", "cV", "d1", "d2", "d3", "cB-cV", "totalCounts", "SN_U", "SN_G", "SN_R", "SN_I", "SN_Z"
        ]
    );

    let chunk = select_batch(&paths, 1, 4);
    assert_eq!(chunk.len(), 4);
    let report = process_paths(chunk, &extractor, 1).unwrap();
    // spec-07 is the only broken file in 4..8
    assert_eq!(report.table.len(), 3);
    assert_eq!(report.failures.len(), 1);
    for row in &report.table.rows {
        let b = row.get("cB").unwrap();
        let v = row.get("cV").unwrap();
        assert!((row.get("cB-cV").unwrap() - (b - v)).abs() < 1e-12);
    }
}
