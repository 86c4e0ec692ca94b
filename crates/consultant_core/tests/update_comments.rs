use std::sync::Once;

use chrono::{TimeZone, Utc};
use consultant_core::{update, AppState, Comment, Effect, Msg, SortOrder};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(client_logging::initialize_for_tests);
}

fn comment(id: &str, parent: Option<&str>, minute: u32) -> Comment {
    Comment {
        id: id.to_string(),
        user_id: format!("user-{id}"),
        user_name: format!("User {id}"),
        text: format!("text of {id}"),
        created_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0).unwrap(),
        updated_at: None,
        parent_id: parent.map(str::to_string),
    }
}

fn with_comments(comments: Vec<Comment>) -> AppState {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::CommentsFetched { comments });
    state
}

#[test]
fn reply_and_edit_composers_are_mutually_exclusive() {
    let state = with_comments(vec![comment("a", None, 0), comment("b", None, 1)]);
    let (state, _) = update(state, Msg::ReplyClicked { id: "a".to_string() });
    let view = state.view(Utc::now()).comments;
    assert!(view.roots.iter().find(|n| n.id == "a").unwrap().replying);

    // Opening an edit closes the reply composer.
    let (state, _) = update(state, Msg::EditClicked { id: "b".to_string() });
    let view = state.view(Utc::now()).comments;
    assert!(!view.roots.iter().any(|n| n.replying));
    assert!(view.roots.iter().find(|n| n.id == "b").unwrap().editing);

    // Clicking the same target again toggles the composer off.
    let (state, _) = update(state, Msg::EditClicked { id: "b".to_string() });
    assert!(!state.view(Utc::now()).comments.roots.iter().any(|n| n.editing));
}

#[test]
fn dismiss_closes_whatever_composer_is_open() {
    let state = with_comments(vec![comment("a", None, 0)]);
    let (state, _) = update(state, Msg::ReplyClicked { id: "a".to_string() });
    let (state, _) = update(state, Msg::ComposerDismissed);
    assert!(!state.view(Utc::now()).comments.roots[0].replying);
}

#[test]
fn replies_are_blocked_past_the_depth_limit() {
    // a -> b -> c -> d puts d at depth 3.
    let state = with_comments(vec![
        comment("a", None, 0),
        comment("b", Some("a"), 1),
        comment("c", Some("b"), 2),
        comment("d", Some("c"), 3),
    ]);
    let (state, effects) = update(state, Msg::ReplyClicked { id: "d".to_string() });
    assert!(effects.is_empty());
    let view = state.view(Utc::now()).comments;
    let deepest = &view.roots[0].replies[0].replies[0].replies[0];
    assert_eq!(deepest.id, "d");
    assert_eq!(deepest.depth, 3);
    assert!(!deepest.can_reply);
    assert!(!deepest.replying);

    // Depth 2 still accepts replies.
    let (state, _) = update(state, Msg::ReplyClicked { id: "c".to_string() });
    let view = state.view(Utc::now()).comments;
    assert!(view.roots[0].replies[0].replies[0].replying);
}

#[test]
fn reply_submission_trims_and_rejects_empty_text() {
    let state = with_comments(vec![comment("a", None, 0)]);
    let (state, effects) = update(
        state,
        Msg::ReplySubmitted {
            parent_id: "a".to_string(),
            text: "   \n ".to_string(),
        },
    );
    assert!(effects.is_empty());

    let (state, _) = update(state, Msg::ReplyClicked { id: "a".to_string() });
    let (state, effects) = update(
        state,
        Msg::ReplySubmitted {
            parent_id: "a".to_string(),
            text: "  looks good  ".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SubmitReply {
            parent_id: "a".to_string(),
            text: "looks good".to_string(),
        }]
    );
    // Submission closes the composer.
    assert!(!state.view(Utc::now()).comments.roots[0].replying);
}

#[test]
fn edit_submission_targets_an_existing_comment() {
    let state = with_comments(vec![comment("a", None, 0)]);
    let (state, effects) = update(
        state,
        Msg::EditSubmitted {
            id: "ghost".to_string(),
            text: "updated".to_string(),
        },
    );
    assert!(effects.is_empty());

    let (_, effects) = update(
        state,
        Msg::EditSubmitted {
            id: "a".to_string(),
            text: " updated ".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SubmitEdit {
            id: "a".to_string(),
            text: "updated".to_string(),
        }]
    );
}

#[test]
fn refresh_drops_composer_targets_that_vanished() {
    let state = with_comments(vec![comment("a", None, 0), comment("b", None, 1)]);
    let (state, _) = update(state, Msg::ReplyClicked { id: "b".to_string() });
    // "b" was deleted by someone else between fetches.
    let (state, _) = update(
        state,
        Msg::CommentsFetched {
            comments: vec![comment("a", None, 0)],
        },
    );
    let view = state.view(Utc::now()).comments;
    assert_eq!(view.roots.len(), 1);
    assert!(!view.roots[0].replying);
}

#[test]
fn sort_toggle_flips_every_level() {
    let state = with_comments(vec![
        comment("a", None, 0),
        comment("b", None, 5),
        comment("a1", Some("a"), 1),
        comment("a2", Some("a"), 2),
    ]);
    let view = state.view(Utc::now()).comments;
    assert_eq!(view.sort, SortOrder::OldestFirst);
    let roots: Vec<&str> = view.roots.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(roots, vec!["a", "b"]);

    let (state, _) = update(state, Msg::CommentSortToggled);
    let view = state.view(Utc::now()).comments;
    assert_eq!(view.sort, SortOrder::NewestFirst);
    let roots: Vec<&str> = view.roots.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(roots, vec!["b", "a"]);
    let replies: Vec<&str> = view.roots[1].replies.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(replies, vec!["a2", "a1"]);
}

#[test]
fn delete_requires_a_known_comment() {
    let state = with_comments(vec![comment("a", None, 0)]);
    let (state, effects) = update(
        state,
        Msg::DeleteCommentClicked {
            id: "ghost".to_string(),
        },
    );
    assert!(effects.is_empty());
    let (_, effects) = update(
        state,
        Msg::DeleteCommentClicked {
            id: "a".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::DeleteComment {
            id: "a".to_string(),
        }]
    );
}

#[test]
fn mutation_failure_surfaces_a_dismissible_error() {
    let state = with_comments(vec![comment("a", None, 0)]);
    let (state, _) = update(
        state,
        Msg::CommentMutationFailed {
            error: "rejected".to_string(),
        },
    );
    assert_eq!(
        state.view(Utc::now()).comments.error.as_deref(),
        Some("rejected")
    );
    let (state, _) = update(
        state,
        Msg::ErrorDismissed {
            widget: consultant_core::Widget::Comments,
        },
    );
    assert!(state.view(Utc::now()).comments.error.is_none());
}

#[test]
fn edited_flag_follows_updated_at() {
    let mut edited = comment("a", None, 0);
    edited.updated_at = Some(Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap());
    let state = with_comments(vec![edited, comment("b", None, 1)]);
    let view = state.view(Utc::now()).comments;
    assert!(view.roots.iter().find(|n| n.id == "a").unwrap().edited);
    assert!(!view.roots.iter().find(|n| n.id == "b").unwrap().edited);
}
