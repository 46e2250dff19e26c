//! Integration tests for the fan-out rules: follows, likes, replies,
//! mentions, new-tweet audience, and read-state echoes.

mod common;

use common::*;
use serde_json::json;

#[tokio::test]
async fn follow_notifies_the_followee_exactly_once() {
    let (base_url, addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "follower").await;
    let (token2, _user2_id) = signup_user(&base_url, "followee").await;

    let (_w1, mut r1, _) = connect_ws(&addr, &token1).await;
    let (_w2, mut r2, _) = connect_ws(&addr, &token2).await;

    let (status, body) =
        post_json(&base_url, "/api/users/followee/follow", &token1, json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["isFollowing"], true);
    assert_eq!(body["followerCount"], 1);

    let data = recv_event(&mut r2, "notification").await;
    assert_eq!(data["type"], "FOLLOW");
    assert_eq!(data["sourceUser"]["username"], "follower");

    assert_no_event(&mut r2, "notification", 300).await;
    assert_no_event(&mut r1, "notification", 300).await;
}

#[tokio::test]
async fn self_follow_is_rejected_upstream() {
    let (base_url, _addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "narcissus").await;

    let (status, _) =
        post_json(&base_url, "/api/users/narcissus/follow", &token1, json!({})).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn like_notifies_the_author_but_never_for_self_likes() {
    let (base_url, addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "author").await;
    let (token2, _user2_id) = signup_user(&base_url, "fan").await;

    let (_w1, mut r1, _) = connect_ws(&addr, &token1).await;

    let (status, body) = post_json(
        &base_url,
        "/api/tweets",
        &token1,
        json!({ "text": "like this" }),
    )
    .await;
    assert_eq!(status, 201);
    let tweet_id = body["tweet"]["id"].as_str().unwrap().to_string();

    // Self-like: the counter moves, no notification event.
    let (status, body) = post_json(
        &base_url,
        &format!("/api/tweets/{}/like", tweet_id),
        &token1,
        json!({}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["likeCount"], 1);
    assert_no_event(&mut r1, "notification", 400).await;

    // A like from somebody else notifies the author.
    let (status, _) = post_json(
        &base_url,
        &format!("/api/tweets/{}/like", tweet_id),
        &token2,
        json!({}),
    )
    .await;
    assert_eq!(status, 200);
    let data = recv_event(&mut r1, "notification").await;
    assert_eq!(data["type"], "LIKE");
    assert_eq!(data["sourceUser"]["username"], "fan");
}

#[tokio::test]
async fn unlike_emits_no_notification() {
    let (base_url, addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "poster").await;
    let (token2, _user2_id) = signup_user(&base_url, "toggler").await;

    let (_w1, mut r1, _) = connect_ws(&addr, &token1).await;

    let (_, body) = post_json(&base_url, "/api/tweets", &token1, json!({ "text": "x" })).await;
    let tweet_id = body["tweet"]["id"].as_str().unwrap().to_string();
    let like_path = format!("/api/tweets/{}/like", tweet_id);

    post_json(&base_url, &like_path, &token2, json!({})).await;
    recv_event(&mut r1, "notification").await;

    let (status, body) = post_json(&base_url, &like_path, &token2, json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["isLiked"], false);
    assert_eq!(body["likeCount"], 0);
    assert_no_event(&mut r1, "notification", 400).await;
}

#[tokio::test]
async fn new_tweet_reaches_followers_and_nobody_else() {
    let (base_url, addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "writer").await;
    let (token2, _user2_id) = signup_user(&base_url, "subscriber").await;
    let (token3, _user3_id) = signup_user(&base_url, "stranger").await;

    let (status, _) =
        post_json(&base_url, "/api/users/writer/follow", &token2, json!({})).await;
    assert_eq!(status, 200);

    let (_w1, mut r1, _) = connect_ws(&addr, &token1).await;
    let (_w2, mut r2, _) = connect_ws(&addr, &token2).await;
    let (_w3, mut r3, _) = connect_ws(&addr, &token3).await;

    let (status, body) = post_json(
        &base_url,
        "/api/tweets",
        &token1,
        json!({ "text": "fresh off the press #news" }),
    )
    .await;
    assert_eq!(status, 201);
    let tweet_id = body["tweet"]["id"].as_str().unwrap();

    let data = recv_event(&mut r2, "new_tweet").await;
    assert_eq!(data["id"], tweet_id);
    assert_eq!(data["author"]["username"], "writer");
    assert_eq!(data["hashtags"][0], "news");

    assert_no_event(&mut r1, "new_tweet", 300).await;
    assert_no_event(&mut r3, "new_tweet", 300).await;
}

#[tokio::test]
async fn reply_notifies_the_parent_author_unless_self() {
    let (base_url, addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "op").await;
    let (token2, _user2_id) = signup_user(&base_url, "replier").await;

    let (_w1, mut r1, _) = connect_ws(&addr, &token1).await;

    let (_, body) = post_json(
        &base_url,
        "/api/tweets",
        &token1,
        json!({ "text": "original" }),
    )
    .await;
    let parent_id = body["tweet"]["id"].as_str().unwrap().to_string();

    // Self-reply: no notification.
    let (status, _) = post_json(
        &base_url,
        "/api/tweets",
        &token1,
        json!({ "text": "following up", "parentId": parent_id }),
    )
    .await;
    assert_eq!(status, 201);
    assert_no_event(&mut r1, "notification", 400).await;

    // Reply from somebody else notifies the parent author.
    let (status, _) = post_json(
        &base_url,
        "/api/tweets",
        &token2,
        json!({ "text": "interesting", "parentId": parent_id }),
    )
    .await;
    assert_eq!(status, 201);
    let data = recv_event(&mut r1, "notification").await;
    assert_eq!(data["type"], "REPLY");
}

#[tokio::test]
async fn reply_to_missing_parent_is_404() {
    let (base_url, _addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "replyvoid").await;

    let (status, _) = post_json(
        &base_url,
        "/api/tweets",
        &token1,
        json!({ "text": "into the void", "parentId": "no-such-tweet" }),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn mentions_notify_resolvable_accounts_only() {
    let (base_url, addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "mentioner").await;
    let (token2, _user2_id) = signup_user(&base_url, "friend").await;

    let (_w2, mut r2, _) = connect_ws(&addr, &token2).await;

    // "@ghost" resolves to nobody; that is not an error.
    let (status, _) = post_json(
        &base_url,
        "/api/tweets",
        &token1,
        json!({ "text": "shoutout to @Friend and @ghost" }),
    )
    .await;
    assert_eq!(status, 201);

    let data = recv_event(&mut r2, "notification").await;
    assert_eq!(data["type"], "MENTION");
    assert_eq!(data["sourceUser"]["username"], "mentioner");
    assert_no_event(&mut r2, "notification", 300).await;
}

#[tokio::test]
async fn self_mention_is_suppressed() {
    let (base_url, addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "selfref").await;

    let (_w1, mut r1, _) = connect_ws(&addr, &token1).await;

    let (status, _) = post_json(
        &base_url,
        "/api/tweets",
        &token1,
        json!({ "text": "note to @selfref" }),
    )
    .await;
    assert_eq!(status, 201);
    assert_no_event(&mut r1, "notification", 400).await;
}

#[tokio::test]
async fn marking_notifications_read_echoes_to_own_channel() {
    let (base_url, addr) = start_test_server().await;
    let (token1, _user1_id) = signup_user(&base_url, "cleaner").await;
    let (token2, _user2_id) = signup_user(&base_url, "causer").await;

    let (_w1, mut r1, _) = connect_ws(&addr, &token1).await;

    // Produce a notification to have something to mark.
    post_json(&base_url, "/api/users/cleaner/follow", &token2, json!({})).await;
    recv_event(&mut r1, "notification").await;

    let (status, _) = post_json(&base_url, "/api/notifications/read", &token1, json!({})).await;
    assert_eq!(status, 200);

    let data = recv_event(&mut r1, "notification_read").await;
    assert_eq!(data["scope"], "all");

    let (status, body) = get_json(&base_url, "/api/notifications", &token1).await;
    assert_eq!(status, 200);
    assert_eq!(body["unreadCount"], 0);
    assert_eq!(body["notifications"][0]["isRead"], true);
}
