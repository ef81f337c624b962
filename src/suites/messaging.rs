//! Messaging and notifications: API behaviour first, then what the trip
//! page shows to the organizer, a going member and an anonymous visitor.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::{optional, unknown_group, wait_for_content, Suite};
use crate::api::types::find_member_id;
use crate::api::{NewTrip, Reaction, RsvpStatus};
use crate::driver::wait::{wait_for_chain, wait_for_locator, wait_for_url, wait_until};
use crate::driver::{Locator, LocatorChain, Viewport};
use crate::error::HarnessError;
use crate::fixture::{Role, Session};
use crate::runner::context::RunContext;
use crate::runner::state::Requirement::{BestEffort, Required};

const ORGANIZER: &str = "Organizer Alice";
const BOB: &str = "Member Bob";
const CAROL: &str = "Member Carol";

const FIRST_MESSAGE: &str = "Hello from the organizer!";
const EDITED_MESSAGE: &str = "Hello from the organizer! (updated)";
/// Marker the feed renders next to an edited message
const EDITED_INDICATOR: &str = "(edited)";
const REPLY: &str = "This is a reply from Bob!";
const DELETED_PLACEHOLDER: &str = "This message was deleted";

const DISCUSSION: &[&str] = &["discussion", "message"];

/// Console noise that is expected on an authenticated page
const IGNORED_CONSOLE: &[&str] = &["401", "Unauthorized", "favicon"];

pub struct MessagingSuite;

pub(crate) fn message_input_chain() -> LocatorChain {
    LocatorChain::new("message input")
        .or(Locator::css(r#"textarea[placeholder*="message" i]"#))
        .or(Locator::css(r#"input[placeholder*="message" i]"#))
        .or(Locator::test_id("message-input"))
        .or(Locator::css("textarea"))
}

pub(crate) fn notification_bell_chain() -> LocatorChain {
    LocatorChain::new("notification bell")
        .or(Locator::aria_label_contains("otification"))
        .or(Locator::test_id_contains("notification"))
        .or(Locator::css("button:has(svg)"))
}

/// Console errors that are not on the ignore list
pub(crate) fn unexpected_console_errors(errors: &[String]) -> Vec<String> {
    errors
        .iter()
        .filter(|e| {
            !IGNORED_CONSOLE
                .iter()
                .any(|ignored| e.to_lowercase().contains(&ignored.to_lowercase()))
        })
        .cloned()
        .collect()
}

fn array_len(body: &Value, pointer: &str) -> usize {
    body.pointer(pointer).and_then(Value::as_array).map_or(0, Vec::len)
}

fn sessions(ctx: &RunContext) -> Result<(Session, Session, String)> {
    Ok((
        ctx.data.session(ORGANIZER)?.clone(),
        ctx.data.session(BOB)?.clone(),
        ctx.data.trip()?.to_string(),
    ))
}

fn required_id(ctx: &RunContext, key: &str) -> Result<String> {
    ctx.data
        .id(key)
        .map(str::to_string)
        .ok_or_else(|| HarnessError::AssertionGap(format!("no {} id; its creation check failed", key)).into())
}

impl MessagingSuite {
    async fn messages_api(&self, ctx: &mut RunContext) -> Result<()> {
        let (alice, bob, trip) = sessions(ctx)?;
        let api = ctx.api().clone();
        let messages = format!("/trips/{}/messages", trip);

        let res = api.get("/health", None).await?;
        ctx.log.check(
            "API /health endpoint",
            Required,
            res.status == 200 && res.str_at("/status") == Some("ok"),
            format!(
                "Status: {}, database: {}",
                res.status,
                res.str_at("/database").unwrap_or("unknown")
            ),
        );

        let res = api
            .post(&messages, Some(&json!({ "content": FIRST_MESSAGE })), Some(&alice))
            .await?;
        let message_id = res.str_at("/message/id").unwrap_or_default().to_string();
        ctx.log.check(
            "Post message via API",
            Required,
            res.status == 201 && !message_id.is_empty(),
            format!("Status: {}, message ID: {}", res.status, message_id),
        );
        if !message_id.is_empty() {
            ctx.data.set_id("message", message_id.clone());
        }

        let res = api
            .post(
                &messages,
                Some(&json!({ "content": REPLY, "parentId": message_id })),
                Some(&bob),
            )
            .await?;
        let reply_id = res.str_at("/message/id").unwrap_or_default().to_string();
        ctx.log.check(
            "Reply to message via API",
            Required,
            res.status == 201 && !reply_id.is_empty(),
            format!("Status: {}, reply ID: {}", res.status, reply_id),
        );
        if !reply_id.is_empty() {
            ctx.data.set_id("reply", reply_id);
        }

        // Replies are nested, so only the first message is top level
        let res = api.get(&messages, Some(&alice)).await?;
        let top_level = array_len(&res.body, "/messages");
        ctx.log.check(
            "Get messages via API",
            Required,
            res.status == 200 && top_level >= 1,
            format!("Status: {}, top-level message count: {}", res.status, top_level),
        );

        let message_id = required_id(ctx, "message")?;
        let res = api
            .post(
                &format!("{}/{}/reactions", messages, message_id),
                Some(&json!({ "emoji": Reaction::ThumbsUp })),
                Some(&bob),
            )
            .await?;
        ctx.log.check(
            "Add reaction via API (thumbs_up)",
            Required,
            matches!(res.status, 200 | 201),
            format!("Status: {}, body: {}", res.status, res.body_snippet(200)),
        );

        let res = api
            .put(
                &format!("{}/{}", messages, message_id),
                &json!({ "content": EDITED_MESSAGE }),
                Some(&alice),
            )
            .await?;
        let edited_at = res.at("/message/editedAt").filter(|v| !v.is_null()).cloned();
        ctx.log.check(
            "Edit own message via API (PUT)",
            Required,
            res.status == 200 && edited_at.is_some(),
            format!(
                "Status: {}, editedAt: {}",
                res.status,
                edited_at.map_or_else(|| "null".to_string(), |v| v.to_string())
            ),
        );

        Ok(())
    }

    async fn moderation_api(&self, ctx: &mut RunContext) -> Result<()> {
        let (alice, bob, trip) = sessions(ctx)?;
        let api = ctx.api().clone();
        let messages = format!("/trips/{}/messages", trip);
        let message_id = required_id(ctx, "message")?;
        let pin_path = format!("{}/{}/pin", messages, message_id);

        for (name, pinned) in [
            ("Pin message via API (organizer)", true),
            ("Unpin message via API (organizer)", false),
        ] {
            let res = api
                .patch(&pin_path, Some(&json!({ "pinned": pinned })), Some(&alice))
                .await?;
            let is_pinned = res.at("/message/isPinned").cloned().unwrap_or(Value::Null);
            ctx.log.check(
                name,
                Required,
                res.status == 200,
                format!("Status: {}, pinned: {}", res.status, is_pinned),
            );
        }

        let res = api.get(&format!("/trips/{}/members", trip), Some(&alice)).await?;
        match find_member_id(&res.body, BOB) {
            Some(bob_id) => {
                let mute_path = format!("/trips/{}/members/{}/mute", trip, bob_id);

                let res = api.post(&mute_path, None, Some(&alice)).await?;
                ctx.log.check(
                    "Mute member via API (organizer)",
                    Required,
                    matches!(res.status, 200 | 201),
                    format!("Status: {}, body: {}", res.status, res.body_snippet(200)),
                );

                let res = api
                    .post(&messages, Some(&json!({ "content": "Should be blocked" })), Some(&bob))
                    .await?;
                ctx.log.check(
                    "Muted member cannot post messages",
                    Required,
                    res.status == 403,
                    format!("Status: {} (expected 403)", res.status),
                );

                let res = api.delete(&mute_path, Some(&alice)).await?;
                ctx.log.check(
                    "Unmute member via API (organizer)",
                    Required,
                    matches!(res.status, 200 | 204),
                    format!("Status: {}", res.status),
                );
            }
            None => {
                ctx.log.fail(
                    "Mute/unmute member via API",
                    format!("Could not find Bob's userId. Members: {}", res.body_snippet(300)),
                );
            }
        }

        let reply_id = required_id(ctx, "reply")?;
        let res = api
            .delete(&format!("{}/{}", messages, reply_id), Some(&alice))
            .await?;
        ctx.log.check(
            "Delete message via API (organizer deletes member's reply)",
            Required,
            res.status == 200,
            format!("Status: {}, body: {}", res.status, res.body_snippet(200)),
        );

        Ok(())
    }

    async fn notifications_api(&self, ctx: &mut RunContext) -> Result<()> {
        let (alice, bob, trip) = sessions(ctx)?;
        let api = ctx.api().clone();

        let res = api.get("/notifications", Some(&bob)).await?;
        ctx.log.check(
            "Get notifications via API",
            Required,
            res.status == 200,
            format!(
                "Status: {}, unreadCount: {}, total: {}",
                res.status,
                res.at("/unreadCount").cloned().unwrap_or(Value::Null),
                res.at("/meta/total").cloned().unwrap_or(Value::Null)
            ),
        );

        let res = api
            .get(&format!("/trips/{}/notification-preferences", trip), Some(&bob))
            .await?;
        ctx.log.check(
            "Get notification preferences via API",
            Required,
            res.status == 200,
            format!(
                "Status: {}, prefs: {}",
                res.status,
                res.at("/preferences").cloned().unwrap_or(Value::Null)
            ),
        );

        let res = api.patch("/notifications/read-all", None, Some(&bob)).await?;
        ctx.log.check(
            "Mark all notifications as read via API",
            Required,
            res.status == 200,
            format!("Status: {}", res.status),
        );

        let res = api.get("/notifications", Some(&bob)).await?;
        let unread = res.at("/unreadCount").and_then(Value::as_i64);
        ctx.log.check(
            "Unread count is 0 after mark-all-read",
            Required,
            res.status == 200 && unread == Some(0),
            format!(
                "Status: {}, unreadCount: {}",
                res.status,
                unread.map_or_else(|| "unknown".to_string(), |n| n.to_string())
            ),
        );

        let res = api
            .get(&format!("/trips/{}/messages/count", trip), Some(&alice))
            .await?;
        ctx.log.check(
            "Message count endpoint",
            Required,
            res.status == 200,
            format!("Status: {}, body: {}", res.status, res.body_snippet(200)),
        );

        let res = api
            .get(&format!("/trips/{}/messages/latest", trip), Some(&alice))
            .await?;
        let has_message = res.at("/message").map_or(false, |m| !m.is_null());
        ctx.log.check(
            "Latest message endpoint",
            Required,
            res.status == 200,
            format!("Status: {}, has message: {}", res.status, has_message),
        );

        Ok(())
    }

    async fn login_page(&self, ctx: &mut RunContext) -> Result<()> {
        let poll = ctx.poll();
        let page = ctx.open_page("anonymous", Viewport::REVIEW, None).await?;
        page.goto(&ctx.web_url("/login")).await?;

        let phone_input = Locator::css(r#"input[type="tel"]"#);
        let found = optional(wait_for_locator(page.as_ref(), &phone_input, &poll).await)?.is_some();
        let shot = ctx.screenshot(page.as_ref(), "01-login-page", false).await?;
        ctx.log.check_with_screenshot(
            "Login page loads with phone input",
            Required,
            found,
            format!("Phone input found: {}", found),
            &shot,
        );

        ctx.close_page("anonymous").await
    }

    async fn organizer_trip_page(&self, ctx: &mut RunContext) -> Result<()> {
        let poll = ctx.poll();
        let alice = ctx.data.session(ORGANIZER)?.clone();
        let url = ctx.web_url(&format!("/trips/{}", ctx.data.trip()?));
        let page = ctx.open_page("organizer", Viewport::REVIEW, Some(&alice)).await?;
        page.goto(&url).await?;

        let has_discussion = wait_for_content(page.as_ref(), DISCUSSION, &poll).await?;
        let shot = ctx.screenshot(page.as_ref(), "02-trip-detail-organizer", true).await?;
        ctx.log.check_with_screenshot(
            "Discussion section visible on trip page (organizer)",
            Required,
            has_discussion,
            format!("Discussion/message text found in page: {}", has_discussion),
            &shot,
        );

        let input_chain = message_input_chain();
        match optional(wait_for_chain(page.as_ref(), &input_chain, &poll).await)? {
            Some(resolved) => {
                page.scroll_into_view(&resolved.locator).await?;
                let shot = ctx.screenshot(page.as_ref(), "03-message-input-visible", false).await?;
                ctx.log.check_with_screenshot(
                    "Message input visible on trip page",
                    Required,
                    true,
                    resolved.describe(),
                    &shot,
                );
            }
            None => {
                let shot = ctx.screenshot(page.as_ref(), "03-no-message-input", false).await?;
                ctx.log.check_with_screenshot(
                    "Message input visible on trip page",
                    Required,
                    false,
                    input_chain.describe_miss(),
                    &shot,
                );
            }
        }

        let feed = LocatorChain::new("organizer message")
            .or(Locator::text_exact(EDITED_MESSAGE))
            .or(Locator::text_exact(FIRST_MESSAGE));
        let shown = optional(wait_for_chain(page.as_ref(), &feed, &poll).await)?;
        ctx.log.check(
            "Messages displayed in feed",
            Required,
            shown.is_some(),
            shown.map_or_else(|| feed.describe_miss(), |r| r.describe()),
        );

        let edited = Locator::text_exact(EDITED_INDICATOR);
        let has_edited = page.count(&edited).await? > 0;
        ctx.log.check(
            "Edited message shows 'edited' indicator",
            Required,
            has_edited,
            format!("{} found: {}", edited, has_edited),
        );

        // The deleted reply may sit in a collapsed thread
        let deleted = Locator::text_exact(DELETED_PLACEHOLDER);
        let mut has_deleted = page.count(&deleted).await? > 0;
        let mut expanded = false;
        if !has_deleted {
            let expand = Locator::has_text("button", "repl");
            if page.count(&expand).await? > 0 {
                page.click(&expand).await?;
                expanded = true;
                has_deleted = optional(wait_for_locator(page.as_ref(), &deleted, &poll).await)?.is_some();
            }
        }
        ctx.log.check(
            "Deleted message shows 'This message was deleted' placeholder",
            Required,
            has_deleted,
            format!("Deleted placeholder found: {} (thread expanded: {})", has_deleted, expanded),
        );

        Ok(())
    }

    async fn notification_bell(&self, ctx: &mut RunContext) -> Result<()> {
        let poll = ctx.poll();
        let page = ctx.page("organizer")?;
        let chain = notification_bell_chain();

        match optional(wait_for_chain(page.as_ref(), &chain, &poll).await)? {
            Some(bell) => {
                page.click(&bell.locator).await?;
                let shot = ctx.screenshot(page.as_ref(), "04-notification-bell", false).await?;
                page.press_key("Escape").await?;
                ctx.log.check_with_screenshot(
                    "Global notification bell visible",
                    Required,
                    true,
                    bell.describe(),
                    &shot,
                );
            }
            None => {
                ctx.log
                    .check("Global notification bell visible", Required, false, chain.describe_miss());
            }
        }
        Ok(())
    }

    async fn member_trip_page(&self, ctx: &mut RunContext) -> Result<()> {
        let poll = ctx.poll();
        let bob = ctx.data.session(BOB)?.clone();
        let url = ctx.web_url(&format!("/trips/{}", ctx.data.trip()?));
        let page = ctx.open_page("member", Viewport::REVIEW, Some(&bob)).await?;
        page.goto(&url).await?;

        let has_discussion = wait_for_content(page.as_ref(), DISCUSSION, &poll).await?;
        let shot = ctx.screenshot(page.as_ref(), "05-trip-detail-member", true).await?;
        ctx.log.check_with_screenshot(
            "Going member sees discussion section",
            Required,
            has_discussion,
            format!("Discussion visible for member: {}", has_discussion),
            &shot,
        );

        let chain = notification_bell_chain();
        let bell = optional(wait_for_chain(page.as_ref(), &chain, &poll).await)?;
        ctx.log.check(
            "Notification bell visible for member",
            Required,
            bell.is_some(),
            bell.map_or_else(|| chain.describe_miss(), |b| b.describe()),
        );

        ctx.close_page("member").await
    }

    async fn console_errors(&self, ctx: &mut RunContext) -> Result<()> {
        let poll = ctx.poll();
        let alice = ctx.data.session(ORGANIZER)?.clone();
        let url = ctx.web_url(&format!("/trips/{}", ctx.data.trip()?));
        let page = ctx.open_page("console", Viewport::REVIEW, Some(&alice)).await?;
        page.goto(&url).await?;
        // Let the page settle before reading what it logged
        wait_for_content(page.as_ref(), DISCUSSION, &poll).await?;

        let unexpected = unexpected_console_errors(&page.console_errors().await?);
        let detail = if unexpected.is_empty() {
            "Unexpected errors (0): none".to_string()
        } else {
            let first: Vec<&str> = unexpected.iter().take(3).map(String::as_str).collect();
            format!("Unexpected errors ({}): {:?}", unexpected.len(), first)
        };
        ctx.log.check(
            "No unexpected console errors on trip page",
            Required,
            unexpected.is_empty(),
            detail,
        );

        ctx.close_page("console").await
    }

    async fn trips_list(&self, ctx: &mut RunContext) -> Result<()> {
        let poll = ctx.poll();
        let page = ctx.page("organizer")?;
        page.goto(&ctx.web_url("/trips")).await?;

        let page_ref = page.as_ref();
        let rendered = optional(
            wait_until(
                "trips list renders",
                || async move { page_ref.body_text().await.map_or(false, |t| !t.trim().is_empty()) },
                &poll,
            )
            .await,
        )?
        .is_some();
        let shot = ctx.screenshot(page.as_ref(), "06-trips-list", false).await?;
        ctx.log.check_with_screenshot(
            "Trips list page loads",
            Required,
            rendered,
            format!("Page rendered text: {}", rendered),
            &shot,
        );
        Ok(())
    }

    async fn unauthenticated_redirect(&self, ctx: &mut RunContext) -> Result<()> {
        let poll = ctx.poll();
        let page = ctx.open_page("anonymous", Viewport::REVIEW, None).await?;
        page.goto(&ctx.web_url("/trips")).await?;

        let login = Regex::new("login")?;
        let redirected = optional(wait_for_url(page.as_ref(), &login, &poll).await)?;
        let final_url = match &redirected {
            Some(url) => url.clone(),
            None => page.current_url().await?,
        };
        let shot = ctx.screenshot(page.as_ref(), "07-unauthenticated-redirect", false).await?;
        ctx.log.check_with_screenshot(
            "Unauthenticated user redirected to login",
            Required,
            redirected.is_some(),
            format!("Final URL: {}", final_url),
            &shot,
        );

        ctx.close_page("anonymous").await
    }

    async fn final_snapshot(&self, ctx: &mut RunContext) -> Result<()> {
        let poll = ctx.poll();
        let page = ctx.page("organizer")?;
        page.goto(&ctx.web_url(&format!("/trips/{}", ctx.data.trip()?)))
            .await?;
        let loaded = wait_for_content(page.as_ref(), DISCUSSION, &poll).await?;
        let shot = ctx.screenshot(page.as_ref(), "08-final-trip-page", true).await?;
        ctx.log.check_with_screenshot(
            "Final trip page snapshot",
            BestEffort,
            loaded,
            format!("Discussion rendered: {}", loaded),
            &shot,
        );
        Ok(())
    }
}

#[async_trait]
impl Suite for MessagingSuite {
    fn name(&self) -> &str {
        "messaging"
    }

    fn groups(&self) -> Vec<String> {
        [
            "messages-api",
            "moderation-api",
            "notifications-api",
            "login-page",
            "organizer-trip-page",
            "notification-bell",
            "member-trip-page",
            "console-errors",
            "trips-list",
            "unauthenticated-redirect",
            "final-snapshot",
        ]
        .iter()
        .map(|g| g.to_string())
        .collect()
    }

    fn artifacts(&self) -> Vec<String> {
        [
            "01-login-page",
            "02-trip-detail-organizer",
            "03-message-input-visible",
            "04-notification-bell",
            "05-trip-detail-member",
            "06-trips-list",
            "07-unauthenticated-redirect",
            "08-final-trip-page",
        ]
        .iter()
        .map(|a| a.to_string())
        .collect()
    }

    async fn setup(&self, ctx: &mut RunContext) -> Result<()> {
        let alice = ctx.fixtures.create_user(Role::Organizer, ORGANIZER).await?;
        let bob = ctx.fixtures.create_user(Role::Member, BOB).await?;
        let carol = ctx.fixtures.create_user(Role::Member, CAROL).await?;

        let trip = NewTrip::new("Verification Trip", "New York", "America/New_York")
            .dates("2026-06-01", "2026-06-07");
        let trip_id = ctx.fixtures.create_trip(&alice, &trip).await?;
        ctx.log.pass("Trip creation via API", format!("Trip ID: {}", trip_id));

        let invited = ctx
            .fixtures
            .invite(&alice, &trip_id, &[bob.phone.as_str(), carol.phone.as_str()])
            .await?;
        ctx.log.pass("Invite members via API", format!("Invitations: {}", invited));

        // Signing in again turns the pending invitations into memberships
        let bob = ctx.fixtures.reauthenticate(&bob).await?;
        let carol = ctx.fixtures.reauthenticate(&carol).await?;
        ctx.fixtures.rsvp(&bob, &trip_id, RsvpStatus::Going).await?;
        ctx.fixtures.rsvp(&carol, &trip_id, RsvpStatus::Going).await?;
        ctx.log.pass("Members accept invitations (RSVP going)", "Bob and Carol RSVP going");

        ctx.data.add_session(alice);
        ctx.data.add_session(bob);
        ctx.data.add_session(carol);
        ctx.data.trip_id = Some(trip_id);
        Ok(())
    }

    async fn run_group(&self, ctx: &mut RunContext, group: &str) -> Result<()> {
        match group {
            "messages-api" => self.messages_api(ctx).await,
            "moderation-api" => self.moderation_api(ctx).await,
            "notifications-api" => self.notifications_api(ctx).await,
            "login-page" => self.login_page(ctx).await,
            "organizer-trip-page" => self.organizer_trip_page(ctx).await,
            "notification-bell" => self.notification_bell(ctx).await,
            "member-trip-page" => self.member_trip_page(ctx).await,
            "console-errors" => self.console_errors(ctx).await,
            "trips-list" => self.trips_list(ctx).await,
            "unauthenticated-redirect" => self.unauthenticated_redirect(ctx).await,
            "final-snapshot" => self.final_snapshot(ctx).await,
            _ => Err(unknown_group(self.name(), group)),
        }
    }
}
