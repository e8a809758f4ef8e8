//! Inline annotations: review comments pinned to highlighted regions of a
//! document page. Each one is a post of its own and can collect followups.

use std::collections::HashMap;

use anyhow::Result;
use referee_db::models::PostKind;
use referee_db::queries;
use referee_types::api::CreateInlineCommentRequest;
use referee_types::models::{HighlightSection, InlineComment};
use rusqlite::Connection;

use crate::ServiceError;
use crate::threads::{followups, summary};

pub fn validate(annotation: &CreateInlineCommentRequest) -> crate::Result<()> {
    if annotation.content.trim().is_empty() {
        return Err(ServiceError::invalid("Inline comment is empty."));
    }
    if annotation.page_num < 0 || annotation.page_num > i64::from(u32::MAX) {
        return Err(ServiceError::invalid(format!(
            "Page number {} is out of range.",
            annotation.page_num
        )));
    }
    Ok(())
}

/// Store the annotations of a freshly inserted review, with their regions.
pub fn insert_all(
    conn: &Connection,
    review_id: i64,
    author_id: &str,
    article_id: i64,
    annotations: &[CreateInlineCommentRequest],
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        let post_id = queries::insert_post(
            conn,
            PostKind::Annotation,
            Some(author_id),
            article_id,
            &annotation.content,
        )?;
        queries::insert_annotation(
            conn,
            post_id,
            review_id,
            annotation.page_num,
            &annotation.selected_content,
        )?;
        for region in &annotation.highlight_sections {
            queries::insert_region(conn, post_id, region)?;
        }
        ids.push(post_id);
    }
    Ok(ids)
}

/// Annotations of a review with their regions. Followups are included only
/// when `with_followups` is set; a review that was just posted has none.
pub fn inline_comments(
    conn: &Connection,
    review_id: i64,
    with_followups: bool,
) -> Result<Vec<InlineComment>> {
    let rows = queries::query_annotations(conn, review_id)?;

    let ids: Vec<i64> = rows.iter().map(|r| r.post.id).collect();
    let mut regions: HashMap<i64, Vec<HighlightSection>> = HashMap::new();
    for r in queries::query_regions(conn, &ids)? {
        regions.entry(r.annotation_id).or_default().push(HighlightSection {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        });
    }

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(InlineComment {
            post: summary(&row.post),
            followups: if with_followups {
                followups(conn, row.post.id)?
            } else {
                Vec::new()
            },
            page_num: u32::try_from(row.page_number)?,
            selected_content: row.selected_text,
            highlight_sections: regions.remove(&row.post.id).unwrap_or_default(),
        });
    }
    Ok(views)
}
