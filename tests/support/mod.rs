//! Fake EcoTaxa web interface for integration tests.
//!
//! Serves just enough of the server-rendered pages (login form, landing page,
//! project list, task creation banner, task listing, task detail page and
//! artifact download) for the session, catalog and export components.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER: &str = "someone@example.org";
pub const PASSWORD: &str = "hunter2";

/// Mock service plus helpers to mount its pages.
pub struct FakeEcotaxa {
    pub server: MockServer,
}

impl FakeEcotaxa {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Mounts the login form and a landing page that shows the logout link
    /// only when `accept` is set.
    pub async fn with_login(&self, accept: bool) -> &Self {
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(html(
                r#"<form method="post">
                    <input type="hidden" name="csrf_token" value="tok-abc"/>
                    <input name="email"/><input type="password" name="password"/>
                </form>"#,
            ))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_string_contains("csrf_token=tok-abc"))
            .respond_with(html("<p>Redirecting</p>"))
            .mount(&self.server)
            .await;

        let nav = if accept {
            r#"<nav><a href="/prj/">Projects</a><a href="/logout">Log out</a></nav>"#
        } else {
            r#"<nav><a href="/login">Log in</a></nav>"#
        };
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(nav))
            .mount(&self.server)
            .await;
        self
    }

    /// Mounts the project list with one primary button per id.
    pub async fn with_projects(&self, ids: &[u64]) -> &Self {
        let mut page = String::from(r#"<table><a href="/prj/999">Breadcrumb</a>"#);
        for id in ids {
            page.push_str(&format!(
                r#"<tr><td><a class="btn btn-primary" href="/prj/{id}">Select</a></td></tr>"#
            ));
        }
        page.push_str("</table>");
        Mock::given(method("GET"))
            .and(path("/prj/"))
            .respond_with(html(&page))
            .mount(&self.server)
            .await;
        self
    }

    /// Acknowledges an export request for `dataset` with task `task`.
    pub async fn with_submission(&self, dataset: u64, task: u64) -> &Self {
        Mock::given(method("POST"))
            .and(path("/Task/Create/TaskExportTxt"))
            .and(query_param("projid", dataset.to_string()))
            .and(body_string_contains("what=TSV"))
            .respond_with(html(&format!(
                r#"<div class="alert alert-success alert-dismissible">
                    <button class="close">&times;</button>Taks {task} created</div>"#
            )))
            .expect(1)
            .mount(&self.server)
            .await;
        self
    }

    /// Answers an export request for `dataset` without a task number.
    pub async fn with_rejected_submission(&self, dataset: u64) -> &Self {
        Mock::given(method("POST"))
            .and(path("/Task/Create/TaskExportTxt"))
            .and(query_param("projid", dataset.to_string()))
            .respond_with(html(
                r#"<div class="alert alert-danger">Access denied</div>"#,
            ))
            .mount(&self.server)
            .await;
        self
    }

    /// Task listing showing `running` tasks for the first `times` requests.
    pub async fn with_task_list_for(&self, running: &[u64], times: u64) -> &Self {
        Mock::given(method("GET"))
            .and(path("/Task/listall"))
            .respond_with(html(&task_listing(running, &[], &[])))
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
        self
    }

    /// Task listing served once any limited listing is used up.
    pub async fn with_task_list(&self, done: &[u64], failed: &[u64]) -> &Self {
        Mock::given(method("GET"))
            .and(path("/Task/listall"))
            .respond_with(html(&task_listing(&[], done, failed)))
            .mount(&self.server)
            .await;
        self
    }

    /// Task detail page naming the dataset and the artifact file.
    pub async fn with_task_page(&self, task: u64, dataset: u64, name: &str, file: &str) -> &Self {
        Mock::given(method("GET"))
            .and(path(format!("/Task/Show/{task}")))
            .respond_with(html(&format!(
                r#"<h3>Task {task}</h3>
                <p>Export of project <a href="/prj/{dataset}">{name}</a></p>
                <a class="btn btn-primary btn-sm" href="/Task/GetFile/{task}/{file}">Get file {file}</a>"#
            )))
            .mount(&self.server)
            .await;
        self
    }

    /// Serves the artifact bytes; expects `expected_calls` downloads.
    pub async fn with_artifact(
        &self,
        task: u64,
        file: &str,
        bytes: Vec<u8>,
        expected_calls: u64,
    ) -> &Self {
        Mock::given(method("GET"))
            .and(path(format!("/Task/GetFile/{task}/{file}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/zip")
                    .set_body_bytes(bytes),
            )
            .expect(expected_calls)
            .mount(&self.server)
            .await;
        self
    }

    /// Accepts the task cleanup request; expects `expected_calls` of them.
    pub async fn with_clean(&self, task: u64, expected_calls: u64) -> &Self {
        Mock::given(method("GET"))
            .and(path(format!("/Task/Clean/{task}")))
            .respond_with(html("<p>Task cleaned</p>"))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
        self
    }

    /// Fails every task cleanup request with a server error.
    pub async fn with_failing_clean(&self, task: u64, expected_calls: u64) -> &Self {
        Mock::given(method("GET"))
            .and(path(format!("/Task/Clean/{task}")))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
        self
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.to_string())
}

fn task_listing(running: &[u64], done: &[u64], failed: &[u64]) -> String {
    let mut page = String::from("<table>");
    for (tasks, label) in [(running, "Running"), (done, "Done"), (failed, "Error")] {
        for task in tasks {
            page.push_str(&format!(
                r#"<tr><td><a href="/Task/Show/{task}">{task}</a></td><td><a href="/Task/Show/{task}">{label}</a></td></tr>"#
            ));
        }
    }
    page.push_str("</table>");
    page
}

/// Builds an in-memory zip archive.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .expect("start zip entry");
        writer.write_all(content).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// A typical artifact: the TSV table for one project.
pub fn export_zip(dataset: u64) -> Vec<u8> {
    let table = format!("object_id\tobject_lat\tobject_lon\n{dataset}_1\t43.68\t7.31\n");
    zip_bytes(&[(&format!("ecotaxa_export_{dataset}.tsv"), table.as_bytes())])
}
