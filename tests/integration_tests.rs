use pipe_analysis::core::report::{ARCHIVE_FILE_NAME, REPORT_FILE_NAME, UPLOAD_KEY};
use pipe_analysis::{run_analysis, EtlError, TomlConfig};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

const DAY_ONE: &str = "\
client_code,client_name,pg_pay_mode,payment_mode,status
C001,Acme Retail,UPI,upi,SUCCESS
C001,Acme Retail,UPI,upi,Failed
C001,Acme Retail,CARD,debit_card,success
C002,Beta Foods,UPI,upi,payment_success
C002,Beta Foods,UPI,upi,pending
C003,,NB,netbanking,FAILED
";

const DAY_TWO: &str = "\
client_code,client_name,pg_pay_mode,payment_mode,status
C001,Acme Retail,UPI,upi,success
C002,Beta Foods,UPI,upi,failure
";

fn write_source(data_dir: &Path, date: &str, content: &str) {
    let dir = data_dir.join("pipe_data");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{}.csv", date)), content).unwrap();
}

fn local_config(data_dir: &Path, output_dir: &Path, extra: &str) -> TomlConfig {
    let toml_content = format!(
        r#"
[source]
type = "local"
data_dir = '{}'

[output]
path = '{}'
{}
"#,
        data_dir.display(),
        output_dir.display(),
        extra
    );
    TomlConfig::from_toml_str(&toml_content).unwrap()
}

fn read_zip_entry(path: &Path, name: &str) -> String {
    let zip_data = std::fs::read(path).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

#[tokio::test]
async fn test_end_to_end_local_analysis() {
    let data_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_source(data_dir.path(), "2025-06-01", DAY_ONE);
    write_source(data_dir.path(), "2025-06-02", DAY_TWO);

    let config = local_config(
        data_dir.path(),
        output_dir.path(),
        "archive = true\n\n[analysis]\ndates = [\"2025-06-01\", \"2025-06-02\"]\n",
    );
    let source = config.source.clone();

    let report_path = run_analysis(&source, config, false).await.unwrap();
    assert!(report_path.ends_with(REPORT_FILE_NAME));

    let csv_name = "PIPE Analysis (2025-06-01-2025-06-02).csv";
    let csv_content = std::fs::read_to_string(output_dir.path().join(csv_name)).unwrap();
    let lines: Vec<&str> = csv_content.lines().collect();

    assert_eq!(
        lines[0],
        "client_name,client_code,pg_pay_mode,payment_mode,success,failed,Total Txn,Success %"
    );
    assert!(lines.contains(&"Acme Retail,C001,UPI,upi,2,1,3,66.67"));
    assert!(lines.contains(&"Acme Retail,C001,CARD,debit_card,1,0,1,100.00"));
    assert!(lines.contains(&"Beta Foods,C002,UPI,upi,1,1,2,50.00"));
    assert!(lines.contains(&"Unknown,C003,NB,netbanking,0,1,1,0.00"));
    // header + 4 groups; the pending row never forms a group
    assert_eq!(lines.len(), 5);

    let html = std::fs::read_to_string(output_dir.path().join(REPORT_FILE_NAME)).unwrap();
    assert!(html.contains("Acme Retail"));
    assert!(html.contains("Loaded files: 2025-06-01"));
    assert!(html.contains("1 rows with other statuses"));

    let archive_path = output_dir.path().join(ARCHIVE_FILE_NAME);
    assert!(archive_path.exists());
    assert_eq!(read_zip_entry(&archive_path, csv_name), csv_content);
    let documents: serde_json::Value =
        serde_json::from_str(&read_zip_entry(&archive_path, "summary.json")).unwrap();
    assert_eq!(documents["C002_UPI_upi"]["failed"], 1);
}

#[tokio::test]
async fn test_latest_file_used_when_no_dates_selected() {
    let data_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_source(data_dir.path(), "2025-06-01", DAY_ONE);
    write_source(data_dir.path(), "2025-06-02", DAY_TWO);

    let config = local_config(data_dir.path(), output_dir.path(), "");
    let source = config.source.clone();
    run_analysis(&source, config, false).await.unwrap();

    assert!(output_dir
        .path()
        .join("PIPE Analysis (2025-06-02).csv")
        .exists());
}

#[tokio::test]
async fn test_client_only_worked_example() {
    let data_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_source(
        data_dir.path(),
        "2025-06-01",
        "client_id,status\nA,success\nA,failed\nB,Success\nC,pending\n",
    );

    let config = local_config(
        data_dir.path(),
        output_dir.path(),
        "upload = true\n\n[schema]\nclient_column = \"client_id\"\ndimension_columns = []\n",
    );
    let source = config.source.clone();
    run_analysis(&source, config, false).await.unwrap();

    // 本地來源的上傳就是寫回資料夾
    let uploaded = std::fs::read_to_string(data_dir.path().join(UPLOAD_KEY)).unwrap();
    let documents: serde_json::Value = serde_json::from_str(&uploaded).unwrap();
    let ids: Vec<&String> = documents.as_object().unwrap().keys().collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(documents["A"]["success"], 1);
    assert_eq!(documents["A"]["failed"], 1);
    assert_eq!(documents["A"]["success_percent"], 50.0);
    assert_eq!(documents["B"]["success"], 1);
    assert_eq!(documents["B"]["failed"], 0);
}

#[tokio::test]
async fn test_header_only_file_renders_empty_report() {
    let data_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_source(
        data_dir.path(),
        "2025-06-01",
        "client_code,client_name,pg_pay_mode,payment_mode,status\n",
    );

    let config = local_config(data_dir.path(), output_dir.path(), "");
    let source = config.source.clone();
    run_analysis(&source, config, false).await.unwrap();

    let csv_content =
        std::fs::read_to_string(output_dir.path().join("PIPE Analysis (2025-06-01).csv")).unwrap();
    assert_eq!(csv_content.lines().count(), 1);

    let html = std::fs::read_to_string(output_dir.path().join(REPORT_FILE_NAME)).unwrap();
    assert!(html.contains("No 'success' or 'failed' transactions."));
}

#[tokio::test]
async fn test_missing_date_is_fatal() {
    let data_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_source(data_dir.path(), "2025-06-01", DAY_ONE);

    let config = local_config(
        data_dir.path(),
        output_dir.path(),
        "\n[analysis]\ndates = [\"2025-06-01\", \"2025-07-01\"]\n",
    );
    let source = config.source.clone();
    let err = run_analysis(&source, config, false).await.unwrap_err();

    assert!(matches!(err, EtlError::ObjectNotFound { ref key } if key == "pipe_data/2025-07-01.csv"));
    assert!(!output_dir.path().join(REPORT_FILE_NAME).exists());
}

#[tokio::test]
async fn test_missing_columns_are_reported_together() {
    let data_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_source(data_dir.path(), "2025-06-01", "client_code,amount\nC001,10\n");

    let config = local_config(data_dir.path(), output_dir.path(), "");
    let source = config.source.clone();
    let err = run_analysis(&source, config, false).await.unwrap_err();

    match err {
        EtlError::MissingColumns { columns } => {
            assert_eq!(columns, vec!["pg_pay_mode", "payment_mode", "status"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_strict_mode_stops_on_malformed_row() {
    let data_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_source(
        data_dir.path(),
        "2025-06-01",
        "client_id,status\nA,success\n,failed\nB,success\n",
    );

    let config = local_config(
        data_dir.path(),
        output_dir.path(),
        "\n[analysis]\non_malformed_row = \"fail_fast\"\n\n[schema]\nclient_column = \"client_id\"\ndimension_columns = []\n",
    );
    let source = config.source.clone();
    let err = run_analysis(&source, config, false).await.unwrap_err();

    assert!(matches!(err, EtlError::MalformedRow { line: 3, .. }));
}
