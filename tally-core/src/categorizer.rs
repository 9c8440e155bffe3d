//! Keyword categorizer for cleaned merchant names.
//!
//! Deliberately coarse: substring hits against an ordered table, first
//! category wins. Credits are never categorized; fees and interest always
//! land in `Fees`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::TransactionType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "Groceries")]
    Groceries,
    #[serde(rename = "Dining")]
    Dining,
    #[serde(rename = "Subscriptions")]
    Subscriptions,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Travel")]
    Travel,
    #[serde(rename = "Transportation")]
    Transportation,
    #[serde(rename = "Gas")]
    Gas,
    #[serde(rename = "Healthcare")]
    Healthcare,
    #[serde(rename = "Utilities")]
    Utilities,
    #[serde(rename = "Entertainment")]
    Entertainment,
    #[serde(rename = "Health & Fitness")]
    HealthFitness,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "Fees")]
    Fees,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Dining => "Dining",
            Category::Subscriptions => "Subscriptions",
            Category::Shopping => "Shopping",
            Category::Travel => "Travel",
            Category::Transportation => "Transportation",
            Category::Gas => "Gas",
            Category::Healthcare => "Healthcare",
            Category::Utilities => "Utilities",
            Category::Entertainment => "Entertainment",
            Category::HealthFitness => "Health & Fitness",
            Category::Education => "Education",
            Category::Fees => "Fees",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Order matters: "uber eats" must hit Dining before "uber" hits Transportation,
// "gap factory" is Shopping before anything else sees "factory".
const RULES: &[(Category, &[&str])] = &[
    (
        Category::Groceries,
        &[
            "wholefds", "whole foods", "kroger", "trader joe", "safeway", "publix", "aldi",
            "patel brothers", "patel brother", "harris teeter", "fresh market", "food lion",
            "wegman", "sprouts", "h-e-b", "market basket", "giant", "stop shop", "meijer",
            "albertsons", "vons", "ralph", "piggly", "grocery", "supermarket", "food mart",
            "fresh fare", "compare foods",
        ],
    ),
    (
        Category::Dining,
        &[
            "restaurant", "kitchen", "grill", "pizza", "sushi", "ramen", "taco", "burger",
            "mcdonald", "chipotle", "panera", "subway", "chick-fil", "domino", "doordash",
            "grubhub", "ubereats", "door dash", "uber eats", "postmates", "seamless",
            "starbucks", "dunkin", "coffee", "cafe", "diner", "bistro", "eatery", "barbeque",
            "bbq", "thai", "chinese", "indian restaurant", "desi district", "pho", "wingstop",
            "five guys", "shake shack", "in-n-out", "popeyes", "kfc", "sonic drive",
            "dairy queen", "applebee", "chilis", "olive garden", "red lobster", "ihop", "denny",
            "tst*", "toast", "benihana", "buffalo wild", "outback", "cracker barrel",
            "cheesecake factory", "texas roadhouse", "hooters", "legal sea",
        ],
    ),
    (
        Category::Subscriptions,
        &[
            "netflix", "spotify", "hulu", "disney+", "apple.com/bill", "google play",
            "google one", "google *google", "youtube premium", "youtube music", "paramount",
            "peacock", "hbo", "max.com", "showtime", "audible", "amazon prime", "apple music",
            "pandora", "tidal", "crunchyroll", "fubo", "microsoft 365", "dropbox", "icloud",
            "adobe", "1password", "lastpass",
        ],
    ),
    (
        Category::Shopping,
        &[
            "amazon", "walmart", "target", "costco", "best buy", "ebay", "etsy", "apple store",
            "apple retail", "ikea", "home depot", "lowe", "tj maxx", "marshalls", "ross",
            "nordstrom", "macy", "gap", "old navy", "h&m", "zara", "forever 21", "bath body",
            "victoria secret", "sephora", "ulta", "chewy", "petco", "pet smart", "staples",
            "office depot", "dollar tree", "dollar general", "five below", "nautica",
            "gap factory", "banana republic", "j.crew", "ann taylor", "dsw", "rack room",
            "shoe carnival", "famous footwear", "foot locker", "burlington coat",
            "tuesday morning",
        ],
    ),
    (
        Category::Travel,
        &[
            "airline", "airways", "united air", "delta air", "american air", "southwest",
            "jetblue", "alaska air", "spirit air", "frontier air", "hotel", "hilton",
            "marriott", "hyatt", "westin", "sheraton", "ihg", "hampton inn", "holiday inn",
            "airbnb", "vrbo", "expedia", "priceline", "booking.com", "hotels.com", "kayak",
            "travelocity", "hertz", "enterprise rent", "avis", "national car", "budget car",
            "amtrak", "greyhound",
        ],
    ),
    (
        Category::Transportation,
        &[
            "uber", "lyft", "taxi", "transit", "metro", "mta", "bart", "parking", "parkmobile",
            "spothero", "divvy", "citi bike", "lime", "bird scooter",
        ],
    ),
    (
        Category::Gas,
        &[
            "bp oil", "bp #", "shell oil", "exxon", "mobil", "chevron", "sunoco", "marathon",
            "citgo", "getty", "speedway", "wawa", "sheetz", "kwik trip", "casey", "circle k",
            "racetrac", "gas station", "fuel", "quiktrip", "7-eleven", "pilot flying",
        ],
    ),
    (
        Category::Healthcare,
        &[
            "pharmacy", "cvs", "walgreen", "rite aid", "hospital", "medical", "doctor", "dental",
            "dentist", "vision", "optometric", "health", "urgent care", "clinic", "laboratory",
            "quest diagnostics", "labcorp", "kaiser", "blue cross", "aetna", "cigna", "humana",
            "insurance",
        ],
    ),
    (
        Category::Utilities,
        &[
            "electric", "gas utility", "water utility", "sewage", "waste", "comcast", "xfinity",
            "spectrum", "cox comm", "at&t", "att.com", "verizon", "t-mobile", "sprint",
            "dish network", "directv", "internet service", "phone bill",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "amc theatre", "regal cinema", "cinemark", "movie", "concert", "ticketmaster",
            "eventbrite", "live nation", "stub hub", "sports ticket", "golf", "bowling",
            "escape room", "dave buster", "arcade", "museum", "zoo", "aquarium", "sea life",
            "theme park", "six flags", "disney world", "legoland", "universal studios",
            "seaworld",
        ],
    ),
    (
        Category::HealthFitness,
        &[
            "planet fitness", "la fitness", "equinox", "gold gym", "ymca", "anytime fitness",
            "crossfit", "peloton", "beachbody", "gym", "fitness", "yoga", "pilates", "sport",
            "athletic",
        ],
    ),
    (
        Category::Education,
        &[
            "tuition", "university", "college", "school", "coursera", "udemy",
            "linkedin learning", "skillshare", "pluralsight", "books", "textbook", "education",
            "tutoring", "chegg",
        ],
    ),
];

/// Map a cleaned merchant name and its type to a coarse spending category.
pub fn categorize(merchant: &str, ty: TransactionType) -> Option<Category> {
    match ty {
        TransactionType::Fee | TransactionType::Interest => return Some(Category::Fees),
        TransactionType::Credit => return None,
        _ => {}
    }

    let name = merchant.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(category, _)| *category)
}
