//! Localized text for classifications and coaching feedback
//!
//! The engine only emits typed keys; rendering happens here so hosts can
//! pick a language per user without changing pipeline behavior.

use crate::exercise::types::Feedback;
use crate::types::{Classification, Locale};

impl Classification {
    /// Human-readable band name
    pub fn label(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Classification::Low, Locale::En) => "Low (Hypoglycemia)",
            (Classification::Low, Locale::Id) => "Rendah (Hipoglikemia)",
            (Classification::NormalHealthy, Locale::En) => "Normal (Healthy)",
            (Classification::NormalHealthy, Locale::Id) => "Normal (Sehat)",
            (Classification::NormalHigh, Locale::En) => "High Normal",
            (Classification::NormalHigh, Locale::Id) => "Normal Tinggi",
            (Classification::Warning, Locale::En) => "Caution (Pre-Diabetes)",
            (Classification::Warning, Locale::Id) => "Waspada (Pre-Diabetes)",
            (Classification::High, Locale::En) => "High (Diabetes)",
            (Classification::High, Locale::Id) => "Tinggi (Diabetes)",
        }
    }

    /// Short advice shown under the band name
    pub fn rationale(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Classification::Low, Locale::En) => "Have a sweet snack or drink right away.",
            (Classification::Low, Locale::Id) => "Segera konsumsi makanan/minuman manis.",
            (Classification::NormalHealthy, Locale::En) => {
                "Very good! Keep up your healthy habits."
            }
            (Classification::NormalHealthy, Locale::Id) => {
                "Sangat baik! Pertahankan pola hidup sehat."
            }
            (Classification::NormalHigh, Locale::En) => {
                "Still reasonable for a random reading, but watch for prediabetes if fasting."
            }
            (Classification::NormalHigh, Locale::Id) => {
                "Masih batas wajar untuk 'Gula Darah Sewaktu', tapi waspada prediabetes jika ini puasa."
            }
            (Classification::Warning, Locale::En) => {
                "This level is quite high. Cut down on sugar and consult a doctor."
            }
            (Classification::Warning, Locale::Id) => {
                "Kadar ini cukup tinggi. Kurangi gula dan konsultasikan ke dokter."
            }
            (Classification::High, Locale::En) => "Danger! See a doctor as soon as possible.",
            (Classification::High, Locale::Id) => "Bahaya! Segera periksakan diri ke dokter.",
        }
    }
}

impl Feedback {
    pub fn message(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.message_en(),
            Locale::Id => self.message_id(),
        }
    }

    fn message_en(&self) -> &'static str {
        match self {
            Feedback::Ready => "Ready? Press Start!",
            Feedback::Start => "Start!",
            Feedback::BodyNotVisible => "Body not fully visible. Step back a little!",
            Feedback::RaiseKnee => "Raise your knee to hip height!",
            Feedback::HoldKnee => "Hold it...",
            Feedback::MarchInPlace => "March in place...",
            Feedback::KeepMarching => "Keep marching!",
            Feedback::StartArmCircles => "Start circling your arms...",
            Feedback::RaiseBothArms => "Raise BOTH arms!",
            Feedback::CircleUp => "Circle upwards...",
            Feedback::SitDown => "Please sit down...",
            Feedback::StandUpSlowly => "Now stand up slowly.",
            Feedback::StandUpStraight => "Stand up straight!",
            Feedback::RepCompleted => "Nice rep!",
            Feedback::TooFast => "Too fast, slow down!",
        }
    }

    fn message_id(&self) -> &'static str {
        match self {
            Feedback::Ready => "Siap? Klik Mulai!",
            Feedback::Start => "Mulai!",
            Feedback::BodyNotVisible => "Badan tidak terlihat penuh. Mundur sedikit!",
            Feedback::RaiseKnee => "Angkat lutut setinggi pinggang!",
            Feedback::HoldKnee => "Tahan sebentar...",
            Feedback::MarchInPlace => "Jalan di tempat...",
            Feedback::KeepMarching => "Terus jalan!",
            Feedback::StartArmCircles => "Mulai putar lengan...",
            Feedback::RaiseBothArms => "Angkat KEDUA tangan!",
            Feedback::CircleUp => "Putar ke atas...",
            Feedback::SitDown => "Silakan duduk...",
            Feedback::StandUpSlowly => "Sekarang berdiri perlahan.",
            Feedback::StandUpStraight => "Berdiri tegak!",
            Feedback::RepCompleted => "Satu repetisi bagus!",
            Feedback::TooFast => "Terlalu cepat, pelan-pelan!",
        }
    }
}
