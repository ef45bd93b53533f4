use std::path::Path;

use chrono::{Duration, Utc};

/// Writes an RSS document with `entries` items published within the last day.
pub fn write_feed(dir: &Path, file: &str, entries: usize) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Fixture</title><link>https://fixture.example</link><description>fixture</description>"#,
    );
    for i in 0..entries {
        let date = (Utc::now() - Duration::hours(i as i64 + 1)).to_rfc2822();
        body.push_str(&format!(
            "<item><title>Story {i}</title><link>https://fixture.example/{i}</link><description>&lt;p&gt;Body {i}&lt;/p&gt;</description><pubDate>{date}</pubDate></item>"
        ));
    }
    body.push_str("</channel></rss>");

    let path = dir.join(file);
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}
