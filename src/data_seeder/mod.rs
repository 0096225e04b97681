// Starter data: the age-band communities and a small video catalog

use chrono::Utc;
use tracing::info;

use crate::{database::Database, models::TagList};

struct SeedGroup {
    name: &'static str,
    slug: &'static str,
    description: &'static str,
    age_min: i64,
    age_max: i64,
    icon: &'static str,
}

struct SeedVideo {
    youtube_id: &'static str,
    title: &'static str,
    channel_name: &'static str,
    description: &'static str,
    age_min: i64,
    age_max: i64,
    category: &'static str,
    tags: &'static [&'static str],
    parent_rating: f64,
    review_count: i64,
}

const GROUPS: &[SeedGroup] = &[
    SeedGroup {
        name: "Tiny Explorers",
        slug: "tiny-explorers",
        description: "For parents of 1-2 year olds. First screens, sensory videos, parent-led viewing tips, and navigating the earliest stages of media exposure.",
        age_min: 1,
        age_max: 2,
        icon: "🐣",
    },
    SeedGroup {
        name: "Curious Toddlers",
        slug: "curious-toddlers",
        description: "For parents of 2-3 year olds. Dealing with tantrums, finding educational content, and managing growing screen curiosity.",
        age_min: 2,
        age_max: 3,
        icon: "🧸",
    },
    SeedGroup {
        name: "Little Learners",
        slug: "little-learners",
        description: "For parents of 3-4 year olds. Pre-school prep, social skills through media, alphabet and counting content.",
        age_min: 3,
        age_max: 4,
        icon: "📚",
    },
    SeedGroup {
        name: "Preschool Pals",
        slug: "preschool-pals",
        description: "For parents of 4-5 year olds. Kindergarten prep, creative content, building independence with screen choices.",
        age_min: 4,
        age_max: 5,
        icon: "🎨",
    },
    SeedGroup {
        name: "Kindergarten Kids",
        slug: "kindergarten-kids",
        description: "For parents of 5-6 year olds. Balancing homework and screen time, age-appropriate shows, and navigating peer influence.",
        age_min: 5,
        age_max: 6,
        icon: "🎒",
    },
];

// Starting ratings are placeholders until real reviews replace them
const VIDEOS: &[SeedVideo] = &[
    SeedVideo {
        youtube_id: "eCkhg71Emos",
        title: "Baby Sensory - Rainbow Colors",
        channel_name: "Baby Sensory",
        description: "Gentle sensory experience with colorful visuals and calming music, perfect for babies and toddlers.",
        age_min: 1,
        age_max: 2,
        category: "Calming",
        tags: &["Bedtime Wind-Down", "Meal Prep"],
        parent_rating: 4.5,
        review_count: 3,
    },
    SeedVideo {
        youtube_id: "BESJqbTCBgg",
        title: "Hey Bear Sensory - Funky Veggies",
        channel_name: "Hey Bear Sensory",
        description: "Colorful dancing vegetables with upbeat music. Great for keeping little ones engaged during meal prep.",
        age_min: 1,
        age_max: 2,
        category: "Educational",
        tags: &["Meal Prep", "Quick Switch"],
        parent_rating: 4.7,
        review_count: 5,
    },
    SeedVideo {
        youtube_id: "tyMPCjnGRS0",
        title: "Twinkle Twinkle Little Star - Super Simple Songs",
        channel_name: "Super Simple Songs",
        description: "Classic lullaby with gentle animation. Perfect for bedtime wind-down routines.",
        age_min: 1,
        age_max: 3,
        category: "Calming",
        tags: &["Bedtime Wind-Down"],
        parent_rating: 4.8,
        review_count: 8,
    },
    SeedVideo {
        youtube_id: "pWepfJ-8XU0",
        title: "Daniel Tiger - Managing Feelings",
        channel_name: "Daniel Tiger's Neighborhood",
        description: "Daniel Tiger learns to manage big feelings with strategies kids can use. Great for emotional development.",
        age_min: 2,
        age_max: 4,
        category: "Social Skills",
        tags: &["Tantrum Moments", "Skill Bridge"],
        parent_rating: 4.9,
        review_count: 12,
    },
    SeedVideo {
        youtube_id: "D0Ajq682yrA",
        title: "Colors Song - CoComelon",
        channel_name: "CoComelon",
        description: "Learn colors through catchy music and animation. Engaging and educational for toddlers.",
        age_min: 2,
        age_max: 3,
        category: "Educational",
        tags: &["Meal Prep", "Quick Switch"],
        parent_rating: 3.8,
        review_count: 6,
    },
    SeedVideo {
        youtube_id: "75NQK-Sm1YY",
        title: "Counting to 10 - Jack Hartmann",
        channel_name: "Jack Hartmann Kids Music",
        description: "Fun counting song with movement. Gets kids moving while learning numbers from 1 to 10.",
        age_min: 2,
        age_max: 4,
        category: "Educational",
        tags: &["Skill Bridge", "Quick Switch"],
        parent_rating: 4.5,
        review_count: 4,
    },
    SeedVideo {
        youtube_id: "M4jkjJGW0OY",
        title: "Calm Down Corner - Sesame Street",
        channel_name: "Sesame Street",
        description: "Elmo and friends learn calming techniques. Breathing exercises and emotional regulation for toddlers.",
        age_min: 2,
        age_max: 4,
        category: "Calming",
        tags: &["Tantrum Moments", "Bedtime Wind-Down"],
        parent_rating: 4.7,
        review_count: 7,
    },
    SeedVideo {
        youtube_id: "hq3yfQnllfQ",
        title: "Phonics Song - A to Z for Kids",
        channel_name: "Kids TV",
        description: "Learn the alphabet and phonics sounds. Each letter comes with examples and fun animation.",
        age_min: 3,
        age_max: 5,
        category: "Educational",
        tags: &["Skill Bridge"],
        parent_rating: 4.4,
        review_count: 6,
    },
    SeedVideo {
        youtube_id: "WWZlLw0EWGM",
        title: "Bluey - Sleepytime (Full Episode)",
        channel_name: "Bluey",
        description: "Bingo goes on a magical dream adventure while learning to sleep in her own bed. Beautifully done.",
        age_min: 3,
        age_max: 6,
        category: "Social Skills",
        tags: &["Bedtime Wind-Down"],
        parent_rating: 5.0,
        review_count: 15,
    },
    SeedVideo {
        youtube_id: "LMlIRb8RiEk",
        title: "Yoga for Kids - Cosmic Kids",
        channel_name: "Cosmic Kids Yoga",
        description: "Fun yoga adventure for kids. Great for burning energy indoors and developing body awareness.",
        age_min: 3,
        age_max: 6,
        category: "Motor Skills",
        tags: &["Public Reset", "Travel"],
        parent_rating: 4.8,
        review_count: 9,
    },
    SeedVideo {
        youtube_id: "5RHEr4JLMFk",
        title: "Numberblocks - Learn to Count",
        channel_name: "Numberblocks",
        description: "Animated number characters that teach math concepts. Engaging and surprisingly effective.",
        age_min: 4,
        age_max: 6,
        category: "Educational",
        tags: &["Skill Bridge", "Meal Prep"],
        parent_rating: 4.9,
        review_count: 11,
    },
    SeedVideo {
        youtube_id: "ULCIGA8Ku-A",
        title: "GoNoodle - Banana Banana Meatball",
        channel_name: "GoNoodle",
        description: "High-energy dance and movement video. Perfect for burning off energy before settling down.",
        age_min: 4,
        age_max: 6,
        category: "Motor Skills",
        tags: &["Quick Switch", "Public Reset"],
        parent_rating: 4.3,
        review_count: 5,
    },
];

/// Inserts the five age-band communities. Existing slugs are left alone, so
/// running this twice is harmless. Returns how many groups were added.
pub async fn seed_groups(db: &Database) -> anyhow::Result<usize> {
    let mut added = 0;
    for group in GROUPS {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO community_groups
                (name, slug, description, age_min, age_max, icon, member_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(group.name)
        .bind(group.slug)
        .bind(group.description)
        .bind(group.age_min)
        .bind(group.age_max)
        .bind(group.icon)
        .bind(Utc::now())
        .execute(&db.pool)
        .await?;
        added += result.rows_affected() as usize;
    }

    info!("Seeded {} of {} community groups", added, GROUPS.len());
    Ok(added)
}

/// Inserts the starter catalog, skipping videos whose YouTube id is present.
pub async fn seed_videos(db: &Database) -> anyhow::Result<usize> {
    let mut added = 0;
    for video in VIDEOS {
        let tags: TagList = video.tags.iter().copied().collect();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO videos
                (youtube_id, title, channel_name, description, age_min, age_max, category,
                 tags, parent_rating, review_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(video.youtube_id)
        .bind(video.title)
        .bind(video.channel_name)
        .bind(video.description)
        .bind(video.age_min)
        .bind(video.age_max)
        .bind(video.category)
        .bind(tags.encode())
        .bind(video.parent_rating)
        .bind(video.review_count)
        .bind(Utc::now())
        .execute(&db.pool)
        .await?;
        added += result.rows_affected() as usize;
    }

    info!("Seeded {} of {} videos", added, VIDEOS.len());
    Ok(added)
}

pub async fn seed_all(db: &Database) -> anyhow::Result<()> {
    seed_groups(db).await?;
    seed_videos(db).await?;
    Ok(())
}
