// CSV report builders. Output carries a UTF-8 BOM so spreadsheet tools
// detect the encoding.

use askline_common::pseudonym::shorten_pseudonym;
use askline_common::{AsklineError, Cluster, Question};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, AsklineError> {
    let body = writer
        .into_inner()
        .map_err(|e| AsklineError::Validation(format!("csv write failed: {e}")))?;
    let mut out = Vec::with_capacity(UTF8_BOM.len() + body.len());
    out.extend_from_slice(UTF8_BOM);
    out.extend_from_slice(&body);
    Ok(out)
}

pub fn questions_csv(questions: &[Question]) -> Result<Vec<u8>, AsklineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "pseudonym",
            "question_text",
            "status",
            "difficulty_level",
            "difficulty_score",
            "keywords",
            "cluster_id",
            "created_at",
        ])
        .map_err(|e| AsklineError::Validation(format!("csv write failed: {e}")))?;

    for q in questions {
        writer
            .write_record([
                q.id.to_string(),
                shorten_pseudonym(&q.pseudonym).to_string(),
                q.question_text.clone(),
                q.status.to_string(),
                q.difficulty_level.map(|l| l.to_string()).unwrap_or_default(),
                q.difficulty_score.map(|s| s.to_string()).unwrap_or_default(),
                q.keywords.join(";"),
                q.cluster_id.map(|c| c.to_string()).unwrap_or_default(),
                q.created_at.to_rfc3339(),
            ])
            .map_err(|e| AsklineError::Validation(format!("csv write failed: {e}")))?;
    }
    finish(writer)
}

pub fn clusters_csv(clusters: &[Cluster]) -> Result<Vec<u8>, AsklineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "label",
            "topic_label",
            "summary",
            "question_count",
            "avg_difficulty",
            "is_locked",
        ])
        .map_err(|e| AsklineError::Validation(format!("csv write failed: {e}")))?;

    for c in clusters {
        writer
            .write_record([
                c.id.to_string(),
                c.display_label().to_string(),
                c.topic_label.clone(),
                c.summary.clone(),
                c.question_count.to_string(),
                format!("{:.2}", c.avg_difficulty),
                c.is_locked.to_string(),
            ])
            .map_err(|e| AsklineError::Validation(format!("csv write failed: {e}")))?;
    }
    finish(writer)
}
