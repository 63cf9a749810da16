//! Join-query composition for the denormalized read views.
//!
//! Every function here is a pure builder: filter input goes in, a
//! deterministic `SelectStatement` comes out, and the repositories execute
//! it. Each join projects an explicit allow-list of the joined side so a
//! nested join can never leak `password_hash` or `refresh_token`.

use sea_orm::sea_query::{
    Alias, Expr, Func, JoinType, Order, Query, SelectStatement, SimpleExpr, SubQueryStatement,
};

use crate::entities::{comments, subscriptions, users, videos, watch_history};

/// Scalar subquery in a projection, the SQL analogue of `$size`/`$lookup`.
fn scalar(select: SelectStatement) -> SimpleExpr {
    SimpleExpr::SubQuery(None, Box::new(SubQueryStatement::SelectStatement(select)))
}

fn count_subscriptions_where(column: subscriptions::Column) -> SelectStatement {
    Query::select()
        .expr(Func::count(Expr::col((
            subscriptions::Entity,
            subscriptions::Column::Id,
        ))))
        .from(subscriptions::Entity)
        .and_where(
            Expr::col((subscriptions::Entity, column)).equals((users::Entity, users::Column::Id)),
        )
        .to_owned()
}

/// Channel profile: match the lowercased username, count inbound and
/// outbound subscriptions, and report whether the requester is among the
/// inbound subscribers. Projection is the fixed public field set.
pub fn channel_profile(username: &str, requester_id: Option<&str>) -> SelectStatement {
    let is_subscribed = match requester_id {
        Some(requester) => Expr::exists(
            Query::select()
                .expr(Expr::value(1))
                .from(subscriptions::Entity)
                .and_where(
                    Expr::col((subscriptions::Entity, subscriptions::Column::ChannelId))
                        .equals((users::Entity, users::Column::Id)),
                )
                .and_where(
                    Expr::col((subscriptions::Entity, subscriptions::Column::SubscriberId))
                        .eq(requester),
                )
                .to_owned(),
        ),
        None => Expr::value(false),
    };

    Query::select()
        .column((users::Entity, users::Column::Id))
        .column((users::Entity, users::Column::Username))
        .column((users::Entity, users::Column::Email))
        .column((users::Entity, users::Column::FullName))
        .column((users::Entity, users::Column::AvatarUrl))
        .column((users::Entity, users::Column::CoverImageUrl))
        .expr_as(
            scalar(count_subscriptions_where(subscriptions::Column::ChannelId)),
            Alias::new("subscriber_count"),
        )
        .expr_as(
            scalar(count_subscriptions_where(
                subscriptions::Column::SubscriberId,
            )),
            Alias::new("subscribed_to_count"),
        )
        .expr_as(is_subscribed, Alias::new("is_subscribed"))
        .from(users::Entity)
        .and_where(Expr::col((users::Entity, users::Column::Username)).eq(username))
        .to_owned()
}

/// Watch history for one user, ordered as watched (append order), each
/// video carrying a flattened owner sub-object (full name, username,
/// avatar only).
pub fn watch_history(user_id: &str) -> SelectStatement {
    Query::select()
        .column((videos::Entity, videos::Column::Id))
        .column((videos::Entity, videos::Column::Title))
        .column((videos::Entity, videos::Column::Description))
        .column((videos::Entity, videos::Column::VideoUrl))
        .column((videos::Entity, videos::Column::ThumbnailUrl))
        .column((videos::Entity, videos::Column::DurationSeconds))
        .column((videos::Entity, videos::Column::Views))
        .column((watch_history::Entity, watch_history::Column::WatchedAt))
        .expr_as(
            Expr::col((users::Entity, users::Column::FullName)),
            Alias::new("owner_full_name"),
        )
        .expr_as(
            Expr::col((users::Entity, users::Column::Username)),
            Alias::new("owner_username"),
        )
        .expr_as(
            Expr::col((users::Entity, users::Column::AvatarUrl)),
            Alias::new("owner_avatar_url"),
        )
        .from(watch_history::Entity)
        .join(
            JoinType::InnerJoin,
            videos::Entity,
            Expr::col((watch_history::Entity, watch_history::Column::VideoId))
                .equals((videos::Entity, videos::Column::Id)),
        )
        .join(
            JoinType::InnerJoin,
            users::Entity,
            Expr::col((videos::Entity, videos::Column::OwnerId))
                .equals((users::Entity, users::Column::Id)),
        )
        .and_where(Expr::col((watch_history::Entity, watch_history::Column::UserId)).eq(user_id))
        .order_by(
            (watch_history::Entity, watch_history::Column::Id),
            Order::Asc,
        )
        .to_owned()
}

/// One page of a channel's videos, windowed after sorting on the update
/// timestamp in the caller-normalized direction.
pub fn video_feed(channel_id: &str, direction: Order, page: u64, limit: u64) -> SelectStatement {
    let offset = page.saturating_sub(1).saturating_mul(limit);

    Query::select()
        .column((videos::Entity, videos::Column::Id))
        .column((videos::Entity, videos::Column::OwnerId))
        .column((videos::Entity, videos::Column::Title))
        .column((videos::Entity, videos::Column::Description))
        .column((videos::Entity, videos::Column::VideoUrl))
        .column((videos::Entity, videos::Column::ThumbnailUrl))
        .column((videos::Entity, videos::Column::DurationSeconds))
        .column((videos::Entity, videos::Column::Views))
        .column((videos::Entity, videos::Column::IsPublished))
        .column((videos::Entity, videos::Column::CreatedAt))
        .column((videos::Entity, videos::Column::UpdatedAt))
        .from(videos::Entity)
        .and_where(Expr::col((videos::Entity, videos::Column::OwnerId)).eq(channel_id))
        .order_by((videos::Entity, videos::Column::UpdatedAt), direction)
        .limit(limit)
        .offset(offset)
        .to_owned()
}

/// Total row count matching the feed filter, for the page envelope.
pub fn video_feed_count(channel_id: &str) -> SelectStatement {
    Query::select()
        .expr_as(
            Func::count(Expr::col((videos::Entity, videos::Column::Id))),
            Alias::new("total"),
        )
        .from(videos::Entity)
        .and_where(Expr::col((videos::Entity, videos::Column::OwnerId)).eq(channel_id))
        .to_owned()
}

/// Single video with its owner flattened into an allow-listed sub-shape.
pub fn video_with_owner(video_id: &str) -> SelectStatement {
    Query::select()
        .column((videos::Entity, videos::Column::Id))
        .column((videos::Entity, videos::Column::Title))
        .column((videos::Entity, videos::Column::Description))
        .column((videos::Entity, videos::Column::VideoUrl))
        .column((videos::Entity, videos::Column::ThumbnailUrl))
        .column((videos::Entity, videos::Column::DurationSeconds))
        .column((videos::Entity, videos::Column::Views))
        .column((videos::Entity, videos::Column::IsPublished))
        .column((videos::Entity, videos::Column::CreatedAt))
        .column((videos::Entity, videos::Column::UpdatedAt))
        .column((videos::Entity, videos::Column::OwnerId))
        .expr_as(
            Expr::col((users::Entity, users::Column::FullName)),
            Alias::new("owner_full_name"),
        )
        .expr_as(
            Expr::col((users::Entity, users::Column::Username)),
            Alias::new("owner_username"),
        )
        .expr_as(
            Expr::col((users::Entity, users::Column::Email)),
            Alias::new("owner_email"),
        )
        .expr_as(
            Expr::col((users::Entity, users::Column::AvatarUrl)),
            Alias::new("owner_avatar_url"),
        )
        .from(videos::Entity)
        .join(
            JoinType::InnerJoin,
            users::Entity,
            Expr::col((videos::Entity, videos::Column::OwnerId))
                .equals((users::Entity, users::Column::Id)),
        )
        .and_where(Expr::col((videos::Entity, videos::Column::Id)).eq(video_id))
        .to_owned()
}

/// Comments under a video, each with the commenter's public identity.
pub fn comments_for_video(video_id: &str) -> SelectStatement {
    Query::select()
        .column((comments::Entity, comments::Column::Id))
        .column((comments::Entity, comments::Column::VideoId))
        .column((comments::Entity, comments::Column::Content))
        .column((comments::Entity, comments::Column::CreatedAt))
        .expr_as(
            Expr::col((users::Entity, users::Column::Username)),
            Alias::new("owner_username"),
        )
        .expr_as(
            Expr::col((users::Entity, users::Column::FullName)),
            Alias::new("owner_full_name"),
        )
        .from(comments::Entity)
        .join(
            JoinType::InnerJoin,
            users::Entity,
            Expr::col((comments::Entity, comments::Column::OwnerId))
                .equals((users::Entity, users::Column::Id)),
        )
        .and_where(Expr::col((comments::Entity, comments::Column::VideoId)).eq(video_id))
        .order_by((comments::Entity, comments::Column::CreatedAt), Order::Asc)
        .to_owned()
}

/// A user's own comments, each with a minimal view of the commented video.
pub fn comments_for_user(user_id: &str) -> SelectStatement {
    Query::select()
        .column((comments::Entity, comments::Column::Id))
        .column((comments::Entity, comments::Column::VideoId))
        .column((comments::Entity, comments::Column::Content))
        .column((comments::Entity, comments::Column::CreatedAt))
        .expr_as(
            Expr::col((videos::Entity, videos::Column::Title)),
            Alias::new("video_title"),
        )
        .expr_as(
            Expr::col((videos::Entity, videos::Column::DurationSeconds)),
            Alias::new("video_duration_seconds"),
        )
        .expr_as(
            Expr::col((videos::Entity, videos::Column::Views)),
            Alias::new("video_views"),
        )
        .from(comments::Entity)
        .join(
            JoinType::InnerJoin,
            videos::Entity,
            Expr::col((comments::Entity, comments::Column::VideoId))
                .equals((videos::Entity, videos::Column::Id)),
        )
        .and_where(Expr::col((comments::Entity, comments::Column::OwnerId)).eq(user_id))
        .order_by((comments::Entity, comments::Column::CreatedAt), Order::Asc)
        .to_owned()
}

/// Subscribers of a channel, projected to public identity fields.
pub fn subscribers_of(channel_id: &str) -> SelectStatement {
    subscription_side(
        subscriptions::Column::ChannelId,
        channel_id,
        subscriptions::Column::SubscriberId,
    )
}

/// Channels a user is subscribed to, projected to public identity fields.
pub fn channels_of(subscriber_id: &str) -> SelectStatement {
    subscription_side(
        subscriptions::Column::SubscriberId,
        subscriber_id,
        subscriptions::Column::ChannelId,
    )
}

fn subscription_side(
    filter_column: subscriptions::Column,
    id: &str,
    join_column: subscriptions::Column,
) -> SelectStatement {
    Query::select()
        .column((users::Entity, users::Column::Id))
        .column((users::Entity, users::Column::Username))
        .column((users::Entity, users::Column::FullName))
        .column((users::Entity, users::Column::AvatarUrl))
        .column((subscriptions::Entity, subscriptions::Column::CreatedAt))
        .from(subscriptions::Entity)
        .join(
            JoinType::InnerJoin,
            users::Entity,
            Expr::col((subscriptions::Entity, join_column))
                .equals((users::Entity, users::Column::Id)),
        )
        .and_where(Expr::col((subscriptions::Entity, filter_column)).eq(id))
        .order_by(
            (subscriptions::Entity, subscriptions::Column::CreatedAt),
            Order::Asc,
        )
        .to_owned()
}
