use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::to_camel_case;

/// Suffix the previous step appends to the files it hands over
pub const JOB_OUT_FILE_EXTENSION: &str = "d.output";

static KEY_DIRECTORY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.*/)").unwrap());

/// The job the validate step runs in: the ordered step names and the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    pub flow: Vec<String>,
    pub current_step: String,
}

impl JobContext {
    pub fn new(flow: Vec<String>, current_step: &str) -> Self {
        JobContext {
            flow,
            current_step: current_step.to_string(),
        }
    }

    pub fn is_last_step(&self) -> bool {
        let position = self.flow.iter().position(|step| *step == self.current_step);
        position == self.flow.len().checked_sub(1)
    }
}

/// Storage location of the file a row was read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub key: Option<String>,
    pub bucket: Option<String>,
}

pub fn find_next_step<'a>(flow: &'a [String], current_step: &str) -> Option<&'a str> {
    let index = flow.iter().position(|step| step == current_step)?;
    flow.get(index + 1).map(String::as_str)
}

pub fn find_previous_step<'a>(flow: &'a [String], current_step: &str) -> Option<&'a str> {
    let index = flow.iter().position(|step| step == current_step)?;
    index.checked_sub(1).and_then(|previous| flow.get(previous)).map(String::as_str)
}

/// Step names resolved once at setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepNames {
    /// Current step in camel case, used as output name suffix
    pub current: String,
    pub next: Option<String>,
    pub previous: Option<String>,
    /// `{CamelPrevious}d.output`, empty for the first step
    pub job_out_file_extension: String,
    pub is_last_step: bool,
}

impl StepNames {
    pub fn resolve(job: &JobContext) -> Self {
        let next = find_next_step(&job.flow, &job.current_step).map(str::to_string);
        let previous = find_previous_step(&job.flow, &job.current_step).map(str::to_string);
        let job_out_file_extension = previous
            .as_deref()
            .map(|step| format!("{}{}", to_camel_case(step), JOB_OUT_FILE_EXTENSION))
            .unwrap_or_default();

        StepNames {
            current: to_camel_case(&job.current_step),
            next,
            previous,
            job_out_file_extension,
            is_last_step: job.is_last_step(),
        }
    }

    /// `{file}{CurrentStep}d`
    pub fn data_output_name(&self, file_name: &str) -> String {
        format!("{}{}d", file_name, self.current)
    }
}

/// Directory part of the input key, including the trailing `/`.
pub fn file_path_from_input(file_info: Option<&FileInfo>) -> String {
    file_info
        .and_then(|info| info.key.as_deref())
        .and_then(|key| KEY_DIRECTORY_REGEX.find(key))
        .map(|found| found.as_str().to_string())
        .unwrap_or_default()
}

pub fn bucket_from_input(file_info: Option<&FileInfo>) -> String {
    file_info
        .and_then(|info| info.bucket.clone())
        .unwrap_or_default()
}

/// Recover the file name a previous step produced from the input key.
///
/// `uploads/CLIENT_usersFlatfileTranslated.output.csv` with name `users` and
/// extension `FlatfileTranslated.output` gives `CLIENT_users`. Falls back to `name`.
pub fn file_name_from_input(name: &str, file_info: Option<&FileInfo>, extension: &str) -> String {
    let Some(key) = file_info.and_then(|info| info.key.as_deref()) else {
        return name.to_string();
    };
    let pattern = format!(
        r"([a-zA-Z0-9_]*{}{})\.(csv|txt)",
        regex::escape(name),
        regex::escape(extension)
    );
    let Ok(regex) = Regex::new(&pattern) else {
        return name.to_string();
    };

    regex
        .captures(key)
        .and_then(|caps| caps.get(1))
        .map(|matched| matched.as_str().replacen(extension, "", 1))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> Vec<String> {
        vec!["flatfile translate".to_string(), "validate".to_string(), "upload".to_string()]
    }

    #[test]
    fn test_step_neighbours() {
        let flow = flow();
        assert_eq!(find_next_step(&flow, "validate"), Some("upload"));
        assert_eq!(find_previous_step(&flow, "validate"), Some("flatfile translate"));
        assert_eq!(find_next_step(&flow, "upload"), None);
        assert_eq!(find_previous_step(&flow, "flatfile translate"), None);
        assert_eq!(find_next_step(&flow, "missing"), None);
    }

    #[test]
    fn test_resolved_step_names() {
        let names = StepNames::resolve(&JobContext::new(flow(), "validate"));
        assert_eq!(names.current, "Validate");
        assert_eq!(names.next.as_deref(), Some("upload"));
        assert_eq!(names.job_out_file_extension, "FlatfileTranslated.output");
        assert!(!names.is_last_step);
        assert_eq!(names.data_output_name("users"), "usersValidated");

        let last = StepNames::resolve(&JobContext::new(flow(), "upload"));
        assert!(last.is_last_step);
    }

    #[test]
    fn test_file_name_from_key() {
        let info = FileInfo {
            key: Some("jobs/42/CLIENT_usersFlatfileTranslated.output.csv".to_string()),
            bucket: Some("ingest".to_string()),
        };
        assert_eq!(
            file_name_from_input("users", Some(&info), "FlatfileTranslated.output"),
            "CLIENT_users"
        );
        assert_eq!(file_name_from_input("sections", Some(&info), "FlatfileTranslated.output"), "sections");
        assert_eq!(file_name_from_input("users", None, ""), "users");
        assert_eq!(file_path_from_input(Some(&info)), "jobs/42/");
        assert_eq!(bucket_from_input(Some(&info)), "ingest");
        assert_eq!(file_path_from_input(None), "");
    }
}
