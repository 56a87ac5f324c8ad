//! Extraction of identifiers and markers from the service's HTML pages.
//!
//! The pages are server-rendered and only a handful of fragments matter:
//! the login form token, the logout link, project anchors, the task creation
//! alert, task listing rows and the task detail page. Everything here is a
//! pure function over the page text so it can be tested without a server.

use std::sync::LazyLock;

use regex::Regex;

use crate::export::{DatasetId, JobId, JobStatus};

#[allow(clippy::expect_used)]
static ANCHOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>").expect("anchor regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static INPUT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<input\b([^>]*)/?>").expect("input regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static DIV_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<div\b([^>]*)>(.*?)</div>").expect("div regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static PROJECT_HREF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/prj/(\d+)/?$").expect("project href regex is valid") // Static pattern, safe to panic
});

// The service spells it "Taks" in its confirmation banner.
#[allow(clippy::expect_used)]
static TASK_NUMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bTa(?:sk|ks)\s+#?(\d+)").expect("task number regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static FILE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfile\s+(\S+)").expect("file name regex is valid") // Static pattern, safe to panic
});

/// Completion marker shown in a finished task's row.
const DONE_MARKER: &str = "Done";

/// Marker shown in a task's row when the server gave up on it.
const ERROR_MARKER: &str = "Error";

/// A parsed HTML element with its attributes and raw inner markup.
#[derive(Debug, Clone)]
struct Element<'a> {
    attributes: Vec<(String, String)>,
    inner: &'a str,
}

impl Element<'_> {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// True when the `class` attribute holds exactly these classes, in any order.
    fn has_exact_classes(&self, expected: &[&str]) -> bool {
        let Some(class) = self.attr("class") else {
            return false;
        };
        let mut actual: Vec<&str> = class.split_whitespace().collect();
        let mut wanted: Vec<&str> = expected.to_vec();
        actual.sort_unstable();
        wanted.sort_unstable();
        actual == wanted
    }

    fn has_class(&self, expected: &str) -> bool {
        self.attr("class")
            .is_some_and(|class| class.split_whitespace().any(|c| c == expected))
    }

    fn text(&self) -> String {
        decode_entities(TAG_PATTERN.replace_all(self.inner, " ").trim())
    }
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    ATTRIBUTE_PATTERN
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or(String::new(), |m| decode_entities(m.as_str()));
            (name, value)
        })
        .collect()
}

fn anchors(html: &str) -> impl Iterator<Item = Element<'_>> {
    ANCHOR_PATTERN.captures_iter(html).filter_map(|caps| {
        Some(Element {
            attributes: parse_attributes(caps.get(1)?.as_str()),
            inner: caps.get(2)?.as_str(),
        })
    })
}

fn divs(html: &str) -> impl Iterator<Item = Element<'_>> {
    DIV_PATTERN.captures_iter(html).filter_map(|caps| {
        Some(Element {
            attributes: parse_attributes(caps.get(1)?.as_str()),
            inner: caps.get(2)?.as_str(),
        })
    })
}

fn decode_entities(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Extracts the login form's CSRF token.
#[must_use]
pub fn csrf_token(html: &str) -> Option<String> {
    INPUT_PATTERN.captures_iter(html).find_map(|caps| {
        let attributes = parse_attributes(caps.get(1)?.as_str());
        let is_token = attributes
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("name") && v == "csrf_token");
        if !is_token {
            return None;
        }
        attributes
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("value"))
            .map(|(_, v)| v)
    })
}

/// True when the page shows a logout link, i.e. the session is authenticated.
#[must_use]
pub fn has_logout_link(html: &str) -> bool {
    anchors(html).any(|a| a.attr("href") == Some("/logout"))
}

/// Lists the project ids linked from the project listing page.
///
/// Only primary-button anchors count; other links to projects (breadcrumbs,
/// descriptions) are ignored. Each id is reported once, in page order.
#[must_use]
pub fn project_ids(html: &str) -> Vec<DatasetId> {
    let mut ids = Vec::new();
    for anchor in anchors(html) {
        if !anchor.has_exact_classes(&["btn", "btn-primary"]) {
            continue;
        }
        let Some(id) = anchor
            .attr("href")
            .and_then(|href| PROJECT_HREF_PATTERN.captures(href))
            .and_then(|caps| caps[1].parse::<u64>().ok())
            .map(DatasetId)
        else {
            continue;
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Extracts the task number from the task creation confirmation banner.
#[must_use]
pub fn submitted_task_id(html: &str) -> Option<JobId> {
    divs(html)
        .filter(|div| div.has_class("alert-success"))
        .find_map(|div| {
            let text = div.text();
            TASK_NUMBER_PATTERN
                .captures(&text)
                .and_then(|caps| caps[1].parse::<u64>().ok())
        })
        .map(JobId)
}

/// Classifies a job from the task listing page.
///
/// A row containing the completion marker means `Complete`, the error marker
/// means `Failed`. A job with no row at all stays `Pending`: absence is not
/// evidence of completion.
#[must_use]
pub fn task_status(html: &str, job: JobId) -> JobStatus {
    let href = format!("/Task/Show/{job}");
    let mut status = JobStatus::Pending;
    for anchor in anchors(html).filter(|a| a.attr("href") == Some(href.as_str())) {
        let text = anchor.text();
        if text.contains(DONE_MARKER) {
            return JobStatus::Complete;
        }
        if text.contains(ERROR_MARKER) {
            status = JobStatus::Failed;
        }
    }
    status
}

/// Extracts the display name of `dataset` from a task detail page.
#[must_use]
pub fn dataset_display_name(html: &str, dataset: DatasetId) -> Option<String> {
    let href = format!("/prj/{dataset}");
    anchors(html)
        .find(|a| a.attr("href") == Some(href.as_str()))
        .map(|a| a.text())
        .filter(|name| !name.is_empty())
}

/// Extracts the artifact file name from a task detail page's download button.
#[must_use]
pub fn artifact_file_name(html: &str) -> Option<String> {
    anchors(html)
        .filter(|a| a.has_exact_classes(&["btn", "btn-primary", "btn-sm"]))
        .find_map(|a| {
            let text = a.text();
            FILE_NAME_PATTERN
                .captures(&text)
                .map(|caps| caps[1].to_string())
        })
}
