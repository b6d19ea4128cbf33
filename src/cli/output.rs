//! Terminal rendering of search results and service reports

use crate::analytics::{SearchAnalytics, SearchStats};
use crate::indexing::{ReindexProgress, ReindexStatus};
use crate::search::{content_type_display_name, ContentType, SearchResult};

/// Default length for description previews
pub const PREVIEW_CHARS: usize = 150;

/// Three decimals, or `N/A` for an absent or non-finite score
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) if score.is_finite() => format!("{:.3}", score),
        _ => "N/A".to_string(),
    }
}

/// Cut to `max_chars` characters and append `...` when shortened
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

fn heading(result: &SearchResult) -> &str {
    result
        .title
        .as_deref()
        .or(result.filename.as_deref())
        .or(result.alt.as_deref())
        .unwrap_or(&result.uid)
}

pub fn print_results(results: &[SearchResult], content_types: &[ContentType]) {
    if results.is_empty() {
        println!("No results found");
        return;
    }

    println!("{} result(s)\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!("{}. {}", i + 1, heading(result));

        let mut details = vec![format!("uid: {}", result.uid)];
        if let Some(content_type) = &result.content_type {
            details.push(format!(
                "type: {}",
                content_type_display_name(content_type, content_types)
            ));
        }
        if let Some(locale) = &result.locale {
            details.push(format!("locale: {}", locale));
        }
        println!("   {}", details.join("  "));

        let mut scores = vec![
            format!("similarity {}", format_score(result.similarity)),
            format!("rerank {}", format_score(result.rerank_score)),
        ];
        if result.fused_score.is_some() {
            scores.push(format!("fused {}", format_score(result.fused_score)));
        }
        println!("   {}", scores.join("  "));

        if let Some(description) = &result.description {
            println!("   {}", truncate_text(description, PREVIEW_CHARS));
        }
        if let Some(url) = &result.url {
            println!("   {}", url);
        }
        println!();
    }
}

pub fn print_content_types(content_types: &[ContentType]) {
    if content_types.is_empty() {
        println!("No content types found");
        return;
    }

    for content_type in content_types {
        println!(
            "{} ({}) - {} field(s)",
            content_type.title,
            content_type.uid,
            content_type.schema.len()
        );
        if let Some(description) = &content_type.description {
            println!("  {}", truncate_text(description, PREVIEW_CHARS));
        }
    }
}

pub fn print_index_status(status: &ReindexStatus) {
    println!("Index Status");
    println!("============");
    println!("Status: {}", status.status);
    if let Some(message) = &status.message {
        println!("Message: {}", message);
    }
    if let Some(stats) = &status.index_stats {
        if let Some(total) = stats.total_entries {
            println!("Total entries: {}", total);
        }
        if let Some(indexed) = stats.indexed_entries {
            println!("Indexed entries: {}", indexed);
        }
        if let Some(last) = stats.last_indexed {
            println!("Last indexed: {}", last.format("%Y-%m-%d %H:%M:%S"));
        }
    }
}

/// One-line progress summary
pub fn progress_line(progress: &ReindexProgress) -> String {
    let mut line = format!(
        "[{}] {}/{} ({:.1}%)",
        progress.status, progress.processed, progress.total, progress.percentage
    );
    if let Some(content_type) = &progress.current_content_type {
        line.push_str(&format!(" - {}", content_type));
    }
    if !progress.errors.is_empty() {
        line.push_str(&format!(" - {} error(s)", progress.errors.len()));
    }
    line
}

pub fn print_analytics(analytics: &SearchAnalytics) {
    let period = &analytics.period;
    println!("Search Analytics ({} days)", period.days);
    println!("=========================");
    println!(
        "Period: {} to {}",
        period.start_date.format("%Y-%m-%d"),
        period.end_date.format("%Y-%m-%d")
    );
    println!("Total searches: {}", analytics.stats.total_searches);
    println!(
        "Success rate: {}",
        analytics
            .success_rate()
            .map(|rate| format!("{:.1}%", rate))
            .unwrap_or_else(|| "N/A".to_string())
    );
    println!(
        "Average response time: {:.0} ms",
        analytics.stats.average_response_time
    );
    println!(
        "Average results: {:.1}",
        analytics.stats.average_results_count
    );

    if !analytics.popular_queries.is_empty() {
        println!("\nPopular queries:");
        for entry in &analytics.popular_queries {
            println!("  {:>5}  {}", entry.count, entry.query);
        }
    }

    if !analytics.error_stats.is_empty() {
        println!("\nErrors:");
        for entry in &analytics.error_stats {
            println!("  {:>5}  {}", entry.count, entry.error);
        }
    }
}

pub fn print_stats(stats: &SearchStats) {
    let flag = |enabled: bool| if enabled { "yes" } else { "no" };

    println!("Search Service");
    println!("==============");
    if let Some(total) = stats.stats.total_entries {
        println!("Total entries: {}", total);
    }
    if let Some(indexed) = stats.stats.indexed_entries {
        println!("Indexed entries: {}", indexed);
    }
    if let Some(last) = stats.stats.last_indexed {
        println!("Last indexed: {}", last.format("%Y-%m-%d %H:%M:%S"));
    }

    let caps = &stats.capabilities;
    println!("\nCapabilities:");
    println!("  text search:   {}", flag(caps.text_search));
    println!("  image search:  {}", flag(caps.image_search));
    println!("  hybrid search: {}", flag(caps.hybrid_search));
    println!("  upload search: {}", flag(caps.upload_search));
}
