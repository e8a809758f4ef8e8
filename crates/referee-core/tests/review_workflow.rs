use std::sync::Arc;

use referee_core::comments::NewComment;
use referee_core::{Engine, ServiceError};
use referee_db::Database;
use referee_types::api::{CreateInlineCommentRequest, CreateReviewRequest};
use referee_types::models::{ANONYMOUS, AUTHOR_ROLE, EXPERT_ROLE, PostedComment, ReviewStatus};

struct World {
    engine: Engine,
    article: i64,
}

fn world() -> World {
    let db = Database::open_in_memory().unwrap();
    db.create_user("ada", "Ada Lovelace", "User").unwrap();
    db.create_user("bob", "Bob Reader", "User").unwrap();
    for (username, field) in [
        ("e1", "Physics"),
        ("e2", "Chemistry"),
        ("e3", "Biology"),
        ("e4", "Statistics"),
    ] {
        db.create_user(username, &username.to_uppercase(), EXPERT_ROLE).unwrap();
        db.register_expert(username, field).unwrap();
    }
    let article = db.create_article("Analytical Engines", &["ada"]).unwrap();

    World {
        engine: Engine::new(Arc::new(db)),
        article,
    }
}

fn review(status: &str) -> CreateReviewRequest {
    CreateReviewRequest {
        content: format!("Verdict: {status}"),
        status: status.into(),
        inline_comments: Vec::new(),
    }
}

fn is_approved(w: &World) -> bool {
    w.engine.db().get_article(w.article).unwrap().unwrap().approved
}

#[test]
fn three_approvals_approve_the_article() {
    let w = world();

    for expert in ["e1", "e2", "e3"] {
        assert!(!is_approved(&w));
        w.engine.post_expert_review(w.article, expert, &review("Approved")).unwrap();
    }
    assert!(is_approved(&w));

    let reviews = w.engine.article_reviews(w.article).unwrap();
    assert_eq!(reviews.len(), 3);
    assert!(reviews.iter().all(|r| r.status == ReviewStatus::Approved));

    let article = w.engine.db().get_article(w.article).unwrap().unwrap();
    assert_eq!(article.approved_count, 3);
}

#[test]
fn two_approvals_stay_pending_regardless_of_other_verdicts() {
    let w = world();
    w.engine.post_expert_review(w.article, "e1", &review("Approved")).unwrap();
    w.engine.post_expert_review(w.article, "e2", &review("Approved")).unwrap();
    w.engine.post_expert_review(w.article, "e3", &review("Rejected")).unwrap();
    w.engine.post_expert_review(w.article, "e4", &review("Needs Work")).unwrap();

    assert!(!is_approved(&w));
    assert_eq!(w.engine.article_reviews(w.article).unwrap().len(), 4);
}

#[test]
fn approval_is_final() {
    let w = world();
    for expert in ["e1", "e2", "e3"] {
        w.engine.post_expert_review(w.article, expert, &review("Approved")).unwrap();
    }

    // no reviews once approved
    assert!(matches!(
        w.engine.post_expert_review(w.article, "e4", &review("Rejected")),
        Err(ServiceError::InvalidArgument(_))
    ));

    // and no status changes either
    let first = w.engine.article_reviews(w.article).unwrap()[0].post.id;
    assert!(matches!(
        w.engine.edit_review_status("e1", first, "Rejected"),
        Err(ServiceError::InvalidArgument(_))
    ));
    assert!(is_approved(&w));
}

#[test]
fn duplicate_review_is_rejected_without_a_new_row() {
    let w = world();
    w.engine.post_expert_review(w.article, "e1", &review("Needs Work")).unwrap();

    assert!(matches!(
        w.engine.post_expert_review(w.article, "e1", &review("Approved")),
        Err(ServiceError::InvalidArgument(_))
    ));

    let reviews = w.engine.article_reviews(w.article).unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].status, ReviewStatus::NeedsWork);
}

#[test]
fn concurrent_duplicates_leave_one_review() {
    let w = world();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = w.engine.clone();
            let article = w.article;
            std::thread::spawn(move || engine.post_expert_review(article, "e1", &review("Approved")).is_ok())
        })
        .collect();
    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(accepted, 1);
    assert_eq!(w.engine.article_reviews(w.article).unwrap().len(), 1);
}

#[test]
fn status_edits_follow_ownership_and_can_approve() {
    let w = world();
    w.engine.post_expert_review(w.article, "e1", &review("Approved")).unwrap();
    w.engine.post_expert_review(w.article, "e2", &review("Approved")).unwrap();
    let third = w
        .engine
        .post_expert_review(w.article, "e3", &review("Needs Work"))
        .unwrap()
        .post
        .id;
    assert!(!is_approved(&w));

    assert!(matches!(
        w.engine.edit_review_status("e1", third, "Approved"),
        Err(ServiceError::NotAuthorized(_))
    ));
    assert!(matches!(
        w.engine.edit_review_status("e3", third, "Fine"),
        Err(ServiceError::InvalidArgument(_))
    ));
    assert!(!is_approved(&w));

    let edited = w.engine.edit_review_status("e3", third, "Approved").unwrap();
    assert_eq!(edited.status, ReviewStatus::Approved);
    assert!(is_approved(&w));
}

#[test]
fn authors_are_anonymous_until_approval() {
    let w = world();

    let posted = w
        .engine
        .post_comment(
            "ada",
            w.article,
            &NewComment {
                root_thread_id: None,
                reply_to_id: None,
                content: "Happy to take questions.".into(),
            },
        )
        .unwrap();
    let PostedComment::TopLevel(thread) = posted else {
        panic!("expected a top-level comment");
    };
    let author = thread.post.author.unwrap();
    assert_eq!(author.username, ANONYMOUS);
    assert_eq!(author.name, ANONYMOUS);
    assert_eq!(author.role, AUTHOR_ROLE);

    // ada answers an annotation on e1's review
    let mut with_note = review("Approved");
    with_note.inline_comments.push(CreateInlineCommentRequest {
        page_num: 0,
        selected_content: "Figure 2".into(),
        content: "Axis labels missing.".into(),
        highlight_sections: Vec::new(),
    });
    let r1 = w.engine.post_expert_review(w.article, "e1", &with_note).unwrap();
    let note = r1.inline_comments[0].post.id;
    w.engine
        .post_comment(
            "ada",
            w.article,
            &NewComment {
                root_thread_id: Some(note),
                reply_to_id: Some(note),
                content: "Fixed in v2.".into(),
            },
        )
        .unwrap();
    w.engine
        .post_comment(
            "bob",
            w.article,
            &NewComment {
                root_thread_id: Some(note),
                reply_to_id: Some(note),
                content: "Agreed.".into(),
            },
        )
        .unwrap();

    let before = w.engine.review(r1.post.id).unwrap();
    let replies = &before.inline_comments[0].followups;
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].post.author.as_ref().unwrap().username, ANONYMOUS);
    assert_eq!(replies[1].post.author.as_ref().unwrap().username, "bob");
    assert_eq!(before.post.author.as_ref().unwrap().role, "Expert in Physics");
    let threads = w.engine.article_comments(w.article).unwrap();
    assert_eq!(threads[0].post.author.as_ref().unwrap().username, ANONYMOUS);

    w.engine.post_expert_review(w.article, "e2", &review("Approved")).unwrap();
    w.engine.post_expert_review(w.article, "e3", &review("Approved")).unwrap();
    assert!(is_approved(&w));

    // same content, now revealed
    let after = w.engine.review(r1.post.id).unwrap();
    let revealed = after.inline_comments[0].followups[0].post.author.as_ref().unwrap();
    assert_eq!(revealed.username, "ada");
    assert_eq!(revealed.name, "Ada Lovelace");
    assert_eq!(revealed.role, AUTHOR_ROLE);

    let threads = w.engine.article_comments(w.article).unwrap();
    assert_eq!(threads[0].post.author.as_ref().unwrap().username, "ada");

    let thread = w.engine.thread(note).unwrap();
    assert_eq!(thread.followups.len(), 2);
    assert_eq!(thread.followups[0].post.author.as_ref().unwrap().username, "ada");
}

#[test]
fn profile_reviews_keep_author_replies_anonymous() {
    let w = world();
    let mut with_note = review("Needs Work");
    with_note.inline_comments.push(CreateInlineCommentRequest {
        page_num: 1,
        selected_content: "Lemma 3".into(),
        content: "Induction step unclear.".into(),
        highlight_sections: Vec::new(),
    });
    let r1 = w.engine.post_expert_review(w.article, "e1", &with_note).unwrap();
    let note = r1.inline_comments[0].post.id;

    for root in [r1.post.id, note] {
        w.engine
            .post_comment(
                "ada",
                w.article,
                &NewComment {
                    root_thread_id: Some(root),
                    reply_to_id: Some(root),
                    content: "Will revise.".into(),
                },
            )
            .unwrap();
    }

    let profile = w.engine.user_reviews("e1").unwrap();
    assert_eq!(profile.len(), 1);
    let shown = &profile[0].review;
    assert_eq!(shown.post.author.as_ref().unwrap().username, "e1");
    assert_eq!(shown.followups.len(), 1);
    let reply = shown.followups[0].post.author.as_ref().unwrap();
    assert_eq!(reply.username, ANONYMOUS);
    assert_eq!(reply.name, ANONYMOUS);
    assert_eq!(reply.role, AUTHOR_ROLE);
    let note_reply = shown.inline_comments[0].followups[0].post.author.as_ref().unwrap();
    assert_eq!(note_reply.username, ANONYMOUS);

    for expert in ["e2", "e3", "e4"] {
        w.engine.post_expert_review(w.article, expert, &review("Approved")).unwrap();
    }
    assert!(is_approved(&w));

    let profile = w.engine.user_reviews("e1").unwrap();
    let reply = profile[0].review.followups[0].post.author.as_ref().unwrap();
    assert_eq!(reply.username, "ada");
    assert_eq!(reply.name, "Ada Lovelace");
}

#[test]
fn deleted_reviewer_leaves_review_uneditable() {
    let w = world();
    let id = w
        .engine
        .post_expert_review(w.article, "e1", &review("Needs Work"))
        .unwrap()
        .post
        .id;
    assert!(w.engine.db().delete_user("e1").unwrap());

    let view = w.engine.review(id).unwrap();
    assert!(view.post.author.is_none());
    assert!(matches!(
        w.engine.edit_review_status("e1", id, "Approved"),
        Err(ServiceError::NotAuthorized(_))
    ));
}
