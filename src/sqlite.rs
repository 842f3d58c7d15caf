use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{info, warn};

pub const EXPORT_HEADER: &str = "URL,Last Visited,Visit Count";
const EXPORT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static COPY_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn get_browser_history_path(browser: &str) -> Result<PathBuf> {
    let system = env::consts::OS;
    let home = PathBuf::from(env::var("HOME").or_else(|_| env::var("USERPROFILE"))?);

    let profile_dir = match (browser.to_lowercase().as_str(), system) {
        ("vivaldi", "windows") => local_app_data()?.join("Vivaldi/User Data/Default"),
        ("vivaldi", "macos") => home.join("Library/Application Support/Vivaldi/Default"),
        ("vivaldi", "linux") => home.join(".config/vivaldi/Default"),
        ("chrome", "windows") => local_app_data()?.join("Google/Chrome/User Data/Default"),
        ("chrome", "macos") => home.join("Library/Application Support/Google/Chrome/Default"),
        ("chrome", "linux") => home.join(".config/google-chrome/Default"),
        ("chromium", "linux") => home.join(".config/chromium/Default"),
        ("brave", "windows") => {
            local_app_data()?.join("BraveSoftware/Brave-Browser/User Data/Default")
        }
        ("brave", "macos") => {
            home.join("Library/Application Support/BraveSoftware/Brave-Browser/Default")
        }
        ("brave", "linux") => home.join(".config/BraveSoftware/Brave-Browser/Default"),
        ("edge", "windows") => local_app_data()?.join("Microsoft/Edge/User Data/Default"),
        ("edge", "macos") => home.join("Library/Application Support/Microsoft Edge/Default"),
        ("edge", "linux") => home.join(".config/microsoft-edge/Default"),
        _ => anyhow::bail!(
            "Unsupported browser '{}' or operating system '{}'",
            browser,
            system
        ),
    };

    let path = profile_dir.join("History");
    info!(action = "resolve", component = "browser_path", browser = browser, path = ?path, "Browser history path resolved");
    Ok(path)
}

fn local_app_data() -> Result<PathBuf> {
    Ok(PathBuf::from(
        env::var("LOCALAPPDATA").context("LOCALAPPDATA is not set")?,
    ))
}

/// Copies the history database so a running browser's lock does not get in
/// the way.
pub fn copy_history_database(history_path: &Path, temp_path: Option<&Path>) -> Result<PathBuf> {
    let start_time = Instant::now();
    info!(action = "start", component = "database_copy", "Copying browser history database");

    let temp_path = temp_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_copy_path);

    info!(action = "copy", component = "database_copy", source = ?history_path, destination = ?temp_path, "Database copy paths");

    if !history_path.exists() {
        anyhow::bail!("History file not found at {:?}", history_path);
    }

    fs::copy(history_path, &temp_path)
        .with_context(|| format!("Failed to copy {:?} to {:?}", history_path, temp_path))?;

    info!(action = "complete", component = "database_copy", duration_ms = start_time.elapsed().as_millis(), "Database copy completed");
    Ok(temp_path)
}

/// Temporary copy location, unique per process and per call.
fn default_copy_path() -> PathBuf {
    let sequence = COPY_COUNTER.fetch_add(1, Ordering::Relaxed);
    env::temp_dir().join(format!(
        "habitlens_history_copy_{}_{}.db",
        std::process::id(),
        sequence
    ))
}

/// Converts a WebKit timestamp (microseconds since 1601-01-01 UTC).
pub fn webkit_to_datetime(micros: i64) -> Option<NaiveDateTime> {
    let epoch = NaiveDate::from_ymd_opt(1601, 1, 1)?.and_hms_opt(0, 0, 0)?;
    epoch.checked_add_signed(Duration::microseconds(micros))
}

pub fn get_date_range(conn: &Connection) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let start_time = Instant::now();
    info!(action = "start", component = "date_range_query", "Querying visit date range");

    let (earliest, latest): (Option<i64>, Option<i64>) = conn
        .query_row(
            "SELECT MIN(last_visit_time), MAX(last_visit_time) FROM urls WHERE last_visit_time > 0",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .context("Failed to query visit dates")?;

    let range = match (
        earliest.and_then(webkit_to_datetime),
        latest.and_then(webkit_to_datetime),
    ) {
        (Some(earliest), Some(latest)) => Some((earliest.date(), latest.date())),
        _ => None,
    };

    match range {
        Some((earliest, latest)) => info!(
            action = "complete",
            component = "date_range_query",
            earliest_date = %earliest,
            latest_date = %latest,
            days_between = (latest - earliest).num_days(),
            duration_ms = start_time.elapsed().as_millis(),
            "Date range query completed"
        ),
        None => warn!(
            action = "complete",
            component = "date_range_query",
            duration_ms = start_time.elapsed().as_millis(),
            "No visit data found"
        ),
    }

    Ok(range)
}

/// Writes the `urls` table as a `URL,Last Visited,Visit Count` export.
///
/// URLs are written as-is, commas included.
pub fn export_history_csv(conn: &Connection) -> Result<String> {
    let start_time = Instant::now();
    info!(action = "start", component = "history_export", "Exporting browser history");

    let mut stmt = conn
        .prepare("SELECT url, last_visit_time, visit_count FROM urls ORDER BY last_visit_time DESC")
        .context("Failed to query browser history")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut csv = String::from(EXPORT_HEADER);
    csv.push('\n');
    let mut exported = 0usize;
    let mut skipped = 0usize;

    for row in rows {
        let (url, last_visit_time, visit_count) = row?;
        let visited = match webkit_to_datetime(last_visit_time) {
            Some(visited) if last_visit_time > 0 => visited,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let url = url.replace(['\r', '\n'], "");
        writeln!(
            csv,
            "{},{},{}",
            url,
            visited.format(EXPORT_TIME_FORMAT),
            visit_count.max(0)
        )?;
        exported += 1;
    }

    info!(
        action = "complete",
        component = "history_export",
        exported,
        skipped,
        duration_ms = start_time.elapsed().as_millis(),
        "Browser history exported"
    );
    Ok(csv)
}

/// Resolves, copies and exports a browser's history, removing the copy
/// afterwards.
pub fn export_browser_history(
    browser: &str,
    history_path: Option<&Path>,
    temp_path: Option<&Path>,
) -> Result<String> {
    let history_path = match history_path {
        Some(path) => path.to_path_buf(),
        None => get_browser_history_path(browser)?,
    };
    let temp_history_path = copy_history_database(&history_path, temp_path)?;

    let conn = Connection::open(&temp_history_path)
        .with_context(|| format!("Failed to open {:?}", temp_history_path))?;
    info!(action = "connect", component = "history_export", "Connected to database");

    if let Some((earliest, latest)) = get_date_range(&conn)? {
        info!(action = "range", component = "history_export", earliest_date = %earliest, latest_date = %latest, "History date range");
    }
    let result = export_history_csv(&conn);
    drop(conn);

    if let Err(e) = fs::remove_file(&temp_history_path) {
        warn!(action = "cleanup", component = "database_copy", error = %e, "Failed to remove temporary file");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::summarize;

    // 2024-01-01T10:00:00Z in WebKit microseconds.
    const JAN_1_10AM: i64 = 13_348_576_800_000_000;

    fn history_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE urls (
                id INTEGER PRIMARY KEY,
                url LONGVARCHAR,
                title LONGVARCHAR,
                visit_count INTEGER DEFAULT 0 NOT NULL,
                last_visit_time INTEGER NOT NULL
            );",
        )
        .unwrap();
        conn
    }

    fn insert(conn: &Connection, url: &str, visits: i64, last_visit_time: i64) {
        conn.execute(
            "INSERT INTO urls (url, title, visit_count, last_visit_time) VALUES (?1, '', ?2, ?3)",
            rusqlite::params![url, visits, last_visit_time],
        )
        .unwrap();
    }

    #[test]
    fn webkit_epoch() {
        let dt = webkit_to_datetime(JAN_1_10AM).unwrap();
        assert_eq!(dt.format(EXPORT_TIME_FORMAT).to_string(), "2024-01-01T10:00:00");
        assert_eq!(
            webkit_to_datetime(0).unwrap().format(EXPORT_TIME_FORMAT).to_string(),
            "1601-01-01T00:00:00"
        );
    }

    #[test]
    fn export_feeds_aggregation() {
        let conn = history_db();
        insert(&conn, "https://example.com/a,b", 2, JAN_1_10AM);
        insert(&conn, "https://example.com/c", 3, JAN_1_10AM + 3_600_000_000);
        insert(&conn, "https://never.visited", 1, 0);

        let csv = export_history_csv(&conn).unwrap();
        assert!(csv.starts_with("URL,Last Visited,Visit Count\n"));
        assert!(csv.contains("https://example.com/a,b,2024-01-01T10:00:00,2\n"));
        assert!(!csv.contains("never.visited"));

        assert_eq!(
            summarize(&csv).unwrap(),
            "URL,Date,Visit Count\nhttps://example.com,2024-01-01,5\n"
        );
    }

    #[test]
    fn date_range() {
        let conn = history_db();
        assert_eq!(get_date_range(&conn).unwrap(), None);

        insert(&conn, "https://a.com", 1, JAN_1_10AM);
        insert(&conn, "https://b.com", 1, JAN_1_10AM + 2 * 86_400_000_000);
        let (earliest, latest) = get_date_range(&conn).unwrap().unwrap();
        assert_eq!(earliest.to_string(), "2024-01-01");
        assert_eq!(latest.to_string(), "2024-01-03");
    }

    #[test]
    fn default_copies_do_not_collide() {
        let first = default_copy_path();
        let second = default_copy_path();
        assert_ne!(first, second);
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains(&std::process::id().to_string()));
    }

    #[test]
    fn copies_are_removed_after_export() {
        let source = env::temp_dir().join(format!("habitlens-source-{}.db", std::process::id()));
        let _ = fs::remove_file(&source);
        {
            let conn = Connection::open(&source).unwrap();
            conn.execute_batch(
                "CREATE TABLE urls (url LONGVARCHAR, title LONGVARCHAR, visit_count INTEGER, last_visit_time INTEGER);",
            )
            .unwrap();
            insert(&conn, "https://a.com", 2, JAN_1_10AM);
        }
        let copy = env::temp_dir().join(format!("habitlens-copy-{}.db", std::process::id()));

        let csv = export_browser_history("vivaldi", Some(&source), Some(&copy)).unwrap();
        assert!(csv.contains("https://a.com,2024-01-01T10:00:00,2"));
        assert!(!copy.exists());
        fs::remove_file(&source).unwrap();
    }

    #[test]
    fn missing_history_file() {
        let missing = env::temp_dir().join("habitlens-does-not-exist.db");
        assert!(copy_history_database(&missing, None).is_err());
    }
}
