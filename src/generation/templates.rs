use rand::seq::SliceRandom;

use super::models::{Language, Post};

const ARABIC_TEMPLATES: [&str; 8] = [
    "في {name}، نؤمن بأن التميز ليس خياراً بل أسلوب حياة. نقدم لكم أفضل الخدمات والمنتجات في مجالنا.",
    "اكتشفوا الفرق مع {name}. جودة عالية وخدمة احترافية تليق بكم وبتطلعاتكم.",
    "لأنكم تستاهلون الأفضل — {name} هنا عشان نحقق لكم تجربة مميزة ما تنسونها.",
    "{name} يقدم لكم حلول مبتكرة تناسب احتياجاتكم. تواصلوا معنا اليوم واكتشفوا المزيد.",
    "ثقة عملائنا هي أكبر إنجازاتنا. شكراً لكل من اختار {name} — نعدكم بالأفضل دائماً.",
    "هل تبحثون عن الجودة والاحترافية؟ {name} وجهتكم الأولى. زورونا وشوفوا بأنفسكم.",
    "مع {name}، كل يوم هو فرصة جديدة للتميز. انضموا لعائلتنا المتنامية واستمتعوا بالفرق.",
    "نفخر في {name} بتقديم خدمات تتجاوز توقعاتكم. جربونا وشاركونا رأيكم.",
];

const ENGLISH_TEMPLATES: [&str; 8] = [
    "At {name}, we believe excellence isn't optional — it's a way of life. We bring you the best services in our field.",
    "Discover the difference with {name}. Premium quality and professional service that matches your ambitions.",
    "Because you deserve the best — {name} is here to deliver an unforgettable experience.",
    "{name} offers innovative solutions tailored to your needs. Contact us today and learn more.",
    "Our clients' trust is our greatest achievement. Thank you for choosing {name} — we promise the best, always.",
    "Looking for quality and professionalism? {name} is your go-to destination. Visit us and see for yourself.",
    "With {name}, every day is a new opportunity to excel. Join our growing family and experience the difference.",
    "At {name}, we pride ourselves on exceeding expectations. Try us and share your experience.",
];

const ARABIC_TAGS: [&str; 10] = [
    "#السعودية",
    "#الرياض",
    "#جدة",
    "#رؤية_2030",
    "#اعمال",
    "#ريادة_اعمال",
    "#نجاح",
    "#تميز",
    "#خدمات",
    "#جودة",
];

const ENGLISH_TAGS: [&str; 10] = [
    "#SaudiArabia",
    "#Riyadh",
    "#Jeddah",
    "#Vision2030",
    "#Business",
    "#Entrepreneurship",
    "#Success",
    "#Quality",
    "#Services",
    "#Growth",
];

const HASHTAGS_PER_POST: usize = 5;

fn sample_tags(pool: &[&str]) -> Vec<String> {
    let mut rng = rand::thread_rng();
    pool.choose_multiple(&mut rng, HASHTAGS_PER_POST)
        .map(|tag| tag.to_string())
        .collect()
}

/// Deterministic fallback generator: template selection is keyed by the
/// post index so any requested count succeeds without a provider.
pub fn template_posts(
    name: &str,
    platforms: &[String],
    language: Language,
    num_posts: i64,
) -> Vec<Post> {
    (0..num_posts as usize)
        .map(|i| {
            let mut post = Post {
                day: i as i64 + 1,
                platform: platforms[i % platforms.len()].clone(),
                text_ar: None,
                text_en: None,
                hashtags_ar: None,
                hashtags_en: None,
            };
            if language.wants_arabic() {
                post.text_ar =
                    Some(ARABIC_TEMPLATES[i % ARABIC_TEMPLATES.len()].replace("{name}", name));
                post.hashtags_ar = Some(sample_tags(&ARABIC_TAGS));
            }
            if language.wants_english() {
                post.text_en =
                    Some(ENGLISH_TEMPLATES[i % ENGLISH_TEMPLATES.len()].replace("{name}", name));
                post.hashtags_en = Some(sample_tags(&ENGLISH_TAGS));
            }
            post
        })
        .collect()
}

/// Fixed sample posts for demo mode. No provider call, no quota spend.
pub fn demo_posts(name: &str, language: Language, platforms: &[String]) -> Vec<Post> {
    let platform_at = |i: usize| {
        platforms
            .get(i)
            .or_else(|| platforms.first())
            .map(String::as_str)
            .unwrap_or("instagram")
            .to_string()
    };

    let samples = [
        (
            platform_at(0),
            format!("في {name}، نؤمن بأن التميز مو مجرد كلام — هو أسلوب حياة. كل يوم نسعى نقدم لكم الأفضل لأنكم تستاهلون. جربونا وشوفوا الفرق بأنفسكم."),
            format!("At {name}, we believe excellence isn't just a word — it's how we operate. Every day we push to bring you the best, because you deserve nothing less. Come see the difference for yourself."),
            vec!["#السعودية", "#تميز", "#جودة", "#الرياض", "#رؤية_2030"],
            vec!["#SaudiArabia", "#Excellence", "#Quality", "#Riyadh", "#Vision2030"],
        ),
        (
            platform_at(1),
            format!("عملاؤنا الكرام هم سر نجاحنا. شكراً لثقتكم في {name} — نعدكم إننا دايماً نطور ونتحسن عشان نكون عند حسن ظنكم."),
            format!("Our valued customers are the secret to our success. Thank you for trusting {name} — we promise to continuously improve and exceed your expectations."),
            vec!["#عملاء", "#ثقة", "#نجاح", "#الرياض", "#خدمات"],
            vec!["#CustomerFirst", "#Trust", "#Success", "#Riyadh", "#Services"],
        ),
        (
            platform_at(2),
            format!("تبي جودة واحترافية؟ {name} وجهتك الأولى. تعال واكتشف ليش عملاؤنا يرجعون لنا كل مرة."),
            format!("Looking for quality and professionalism? {name} is your go-to. Come discover why our clients always come back."),
            vec!["#جودة", "#احترافية", "#السعودية", "#تسوق", "#اعمال"],
            vec!["#Quality", "#Professional", "#SaudiArabia", "#Business", "#Growth"],
        ),
    ];

    samples
        .into_iter()
        .enumerate()
        .map(|(i, (platform, text_ar, text_en, tags_ar, tags_en))| Post {
            day: i as i64 + 1,
            platform,
            text_ar: language
                .wants_arabic()
                .then_some(text_ar),
            text_en: language
                .wants_english()
                .then_some(text_en),
            hashtags_ar: language
                .wants_arabic()
                .then(|| tags_ar.iter().map(|t| t.to_string()).collect()),
            hashtags_en: language
                .wants_english()
                .then(|| tags_en.iter().map(|t| t.to_string()).collect()),
        })
        .collect()
}
