//! Test fixtures and factory functions for creating test data.

use serde_json::json;

/// Question bank with a single classical word.
pub const WOKASHI_CSV: &str = "問題番号,古文単語,日本語訳\n1,をかし,趣がある・風情がある\n";

/// Generate a CSV bank with `num_questions` questions.
///
/// Question `i` has prompt `問{i}` and answer `意味{i}番`, so answers never
/// contain one another.
pub fn sample_csv(num_questions: usize) -> String {
    let mut csv = String::from("問題番号,古文単語,日本語訳\n");
    for i in 1..=num_questions {
        csv.push_str(&format!("{i},問{i},意味{i}番\n"));
    }
    csv
}

/// Expected answer for a prompt from [`sample_csv`] or [`WOKASHI_CSV`].
pub fn answer_for(prompt: &str) -> String {
    match prompt {
        "をかし" => "趣がある".to_string(),
        _ => format!("意味{}番", prompt.trim_start_matches('問')),
    }
}

/// An answer no fixture question accepts.
pub const WRONG_ANSWER: &str = "まちがい";

/// Create a start session request body.
pub fn start_request(student_name: &str, question_count: Option<usize>) -> serde_json::Value {
    match question_count {
        Some(n) => json!({ "student_name": student_name, "question_count": n }),
        None => json!({ "student_name": student_name }),
    }
}

/// Create an answer request body.
pub fn answer_request(answer: &str) -> serde_json::Value {
    json!({ "answer": answer })
}

/// Create a draft request body.
pub fn draft_request(draft: &str) -> serde_json::Value {
    json!({ "draft": draft })
}
