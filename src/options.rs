//! Closed option sets offered by the generator form.
//!
//! Every option has a display label. The label is what gets interpolated into
//! the prompt, what serde reads and writes, and what the `options` command
//! prints. Parsing is forgiving about case, spaces and punctuation so that
//! `hyper-realistic`, `Hyper realistic` and `HYPER_REALISTIC` all resolve.

use std::fmt;
use std::str::FromStr;

/// Returned when a string does not name any value of an option set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} '{value}'. Run `cinegen options {kind}` to see valid values")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
}

/// Lowercase alphanumerics only, used for label comparison.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every value, in menu order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Short name used in error messages and the `options` command.
            pub const KIND: &'static str = $kind;

            pub fn label(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| normalize(v.label()) == wanted)
                    .ok_or_else(|| UnknownOption {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

labeled_enum! {
    /// Emotional tone of the clip.
    Mood ("mood") {
        Adventurous => "Adventurous",
        Anxious => "Anxious",
        Chaotic => "Chaotic",
        #[default]
        Cinematic => "Cinematic",
        Comedic => "Comedic",
        Dramatic => "Dramatic",
        Dreamy => "Dreamy",
        Energetic => "Energetic",
        Ethereal => "Ethereal",
        Festive => "Festive",
        Futuristic => "Futuristic",
        Gritty => "Gritty",
        Hopeful => "Hopeful",
        Horror => "Horror",
        Joyful => "Joyful",
        Majestic => "Majestic",
        Melancholic => "Melancholic",
        Mischievous => "Mischievous",
        Mysterious => "Mysterious",
        Nostalgic => "Nostalgic",
        Ominous => "Ominous",
        Peaceful => "Peaceful",
        Playful => "Playful",
        Reflective => "Reflective",
        Romantic => "Romantic",
        Serene => "Serene",
        Somber => "Somber",
        Spiritual => "Spiritual",
        Suspenseful => "Suspenseful",
        Tranquil => "Tranquil",
        Triumphant => "Triumphant",
        Uplifting => "Uplifting",
        Vintage => "Vintage",
        Whimsical => "Whimsical",
    }
}

labeled_enum! {
    /// Artistic style of the clip.
    Style ("style") {
        Abstract => "Abstract",
        Afrofuturism => "Afrofuturism",
        Anime => "Anime",
        ArtBrut => "Art Brut",
        ArtDeco => "Art Deco",
        ArtNouveau => "Art Nouveau",
        Baroque => "Baroque",
        Bauhaus => "Bauhaus",
        Biopunk => "Biopunk",
        BlackAndWhite => "Black and White",
        CassetteFuturism => "Cassette Futurism",
        Christmas => "Christmas",
        Claymation => "Claymation",
        ComicBook => "Comic Book",
        Cubism => "Cubism",
        Cyberpunk => "Cyberpunk",
        Dadaism => "Dadaism",
        DarkFantasy => "Dark Fantasy",
        DeStijl => "De Stijl",
        Dieselpunk => "Dieselpunk",
        Expressionism => "Expressionism",
        Fantasy => "Fantasy",
        Fauvism => "Fauvism",
        FolkArt => "Folk Art",
        Futurism => "Futurism",
        GhibliEsque => "Ghibli-esque",
        GlitchArt => "Glitch Art",
        Gothic => "Gothic",
        Graffiti => "Graffiti",
        #[default]
        HyperRealistic => "Hyper-realistic",
        Impressionistic => "Impressionistic",
        IslamicArt => "Islamic Art",
        LoFi => "Lo-fi",
        LowPoly => "Low Poly",
        Minimalist => "Minimalist",
        Neoclassicism => "Neoclassicism",
        Noir => "Noir",
        OilPainting => "Oil Painting",
        PixelArt => "Pixel Art",
        Pointillism => "Pointillism",
        PopArt => "Pop Art",
        Psychedelic => "Psychedelic",
        Realism => "Realism",
        Renaissance => "Renaissance",
        Rococo => "Rococo",
        Romanticism => "Romanticism",
        Scream => "Scream",
        SciFi => "Sci-Fi",
        Sketch => "Sketch",
        Solarpunk => "Solarpunk",
        Steampunk => "Steampunk",
        Suprematism => "Suprematism",
        Surreal => "Surreal",
        Synthwave => "Synthwave",
        TimBurton => "Tim Burton",
        TrompeLoeil => "Trompe-l'œil",
        UkiyoE => "Ukiyo-e",
        Vaporwave => "Vaporwave",
        VintageFilm => "Vintage Film",
        VoxelArt => "Voxel Art",
        Watercolor => "Watercolor",
    }
}

labeled_enum! {
    AspectRatio ("aspect-ratio") {
        #[default]
        Widescreen => "16:9",
        Portrait => "9:16",
        Square => "1:1",
        Classic => "4:3",
        Anamorphic => "2.39:1",
    }
}

labeled_enum! {
    Resolution ("resolution") {
        Sd => "SD",
        #[default]
        Hd => "HD",
        Uhd => "4K",
    }
}

labeled_enum! {
    /// Opening visual treatment.
    IntroType ("intro") {
        BookOpen => "Book Open",
        ClockWipe => "Clock Wipe",
        Crossfade => "Crossfade",
        CurtainOpen => "Curtain Open",
        DigitalScanlines => "Digital Scanlines",
        DynamicTransition => "Dynamic Transition",
        FadeInOut => "Fade In/Out",
        FocusPull => "Focus Pull",
        GlitchIntro => "Glitch Intro",
        HandDrawnReveal => "Hand-drawn Reveal",
        InkReveal => "Ink Reveal",
        Iris => "Iris",
        Kaleidoscope => "Kaleidoscope",
        LensFlare => "Lens Flare",
        LiquidMetal => "Liquid Metal",
        LogoAnimation => "Logo Animation",
        #[default]
        None => "None",
        OldFilmProjector => "Old Film Projector",
        ParticleBurst => "Particle Burst",
        PixelateIn => "Pixelate In",
        Shatter => "Shatter",
        Slide => "Slide",
        StopMotionReveal => "Stop Motion Reveal",
        TimeLapseReveal => "Time-lapse Reveal",
        TitleCard => "Title Card",
        Wipe => "Wipe",
        Zoom => "Zoom",
    }
}

labeled_enum! {
    TextAnimationStyle ("text-animation") {
        Blink => "Blink",
        Bounce => "Bounce",
        Chase => "Chase",
        DropIn => "Drop In",
        Echo => "Echo",
        Elastic => "Elastic",
        #[default]
        FadeIn => "Fade In",
        Flicker => "Flicker",
        Flip => "Flip",
        Fountain => "Fountain",
        Glitch => "Glitch",
        Glow => "Glow",
        Jelly => "Jelly",
        Pop => "Pop",
        Pulse => "Pulse",
        Shake => "Shake",
        SlideIn => "Slide In",
        Spin => "Spin",
        Strobe => "Strobe",
        Stutter => "Stutter",
        Swirl => "Swirl",
        Typewriter => "Typewriter",
        Wave => "Wave",
        Wiggle => "Wiggle",
        Wobble => "Wobble",
        ZoomIn => "Zoom In",
    }
}

labeled_enum! {
    TextAnimationSpeed ("text-speed") {
        Slow => "Slow",
        #[default]
        Normal => "Normal",
        Fast => "Fast",
    }
}

labeled_enum! {
    /// Canned sound effects. `None` exists only so the form can name it.
    SoundEffect ("sound-effect") {
        #[default]
        None => "None",
        Applause => "Applause",
        Bell => "Bell",
        Birdsong => "Birdsong",
        Camera => "Camera",
        Explosion => "Explosion",
        HoHoHo => "Ho Ho Ho",
        MagicWand => "Magic Wand",
        OceanWaves => "Ocean Waves",
        Rain => "Rain",
        Thunder => "Thunder",
    }
}

labeled_enum! {
    ParticleType ("particles") {
        #[default]
        None => "None",
        Sparkles => "Sparkles",
        Dust => "Dust",
        Confetti => "Confetti",
        Rain => "Rain",
        Snow => "Snow",
        Fireflies => "Fireflies",
    }
}

labeled_enum! {
    ImageFilter ("filter") {
        #[default]
        None => "None",
        Sepia => "Sepia",
        Grayscale => "Grayscale",
        Invert => "Invert",
        Vintage => "Vintage",
        Technicolor => "Technicolor",
        Lomo => "Lomo",
        Polaroid => "Polaroid",
    }
}

impl SoundEffect {
    /// File stem of the bundled playback asset, e.g. `ocean_waves`.
    pub fn file_stem(self) -> String {
        self.label().to_lowercase().replace(' ', "_")
    }

    pub fn is_none(self) -> bool {
        self == SoundEffect::None
    }
}

impl ParticleType {
    pub fn is_none(self) -> bool {
        self == ParticleType::None
    }
}

impl ImageFilter {
    pub fn is_none(self) -> bool {
        self == ImageFilter::None
    }
}

/// Comma separated labels, as listed in the analysis instruction.
pub fn joined_labels<T: Copy + fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Labels of every value of the named option set, if the kind is known.
pub fn labels_for_kind(kind: &str) -> Option<Vec<&'static str>> {
    fn labels<T: Copy>(all: &[T], label: fn(T) -> &'static str) -> Vec<&'static str> {
        all.iter().map(|v| label(*v)).collect()
    }

    let labels = match normalize(kind).as_str() {
        "mood" => labels(Mood::ALL, Mood::label),
        "style" => labels(Style::ALL, Style::label),
        "aspectratio" => labels(AspectRatio::ALL, AspectRatio::label),
        "resolution" => labels(Resolution::ALL, Resolution::label),
        "intro" => labels(IntroType::ALL, IntroType::label),
        "textanimation" => labels(TextAnimationStyle::ALL, TextAnimationStyle::label),
        "textspeed" => labels(TextAnimationSpeed::ALL, TextAnimationSpeed::label),
        "soundeffect" => labels(SoundEffect::ALL, SoundEffect::label),
        "particles" => labels(ParticleType::ALL, ParticleType::label),
        "filter" => labels(ImageFilter::ALL, ImageFilter::label),
        _ => return None,
    };
    Some(labels)
}

/// Every option set name accepted by [`labels_for_kind`].
pub const OPTION_KINDS: &[&str] = &[
    Mood::KIND,
    Style::KIND,
    AspectRatio::KIND,
    Resolution::KIND,
    IntroType::KIND,
    TextAnimationStyle::KIND,
    TextAnimationSpeed::KIND,
    SoundEffect::KIND,
    ParticleType::KIND,
    ImageFilter::KIND,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_counts() {
        assert_eq!(Mood::ALL.len(), 34);
        assert_eq!(Style::ALL.len(), 61);
        assert_eq!(IntroType::ALL.len(), 27);
        assert_eq!(TextAnimationStyle::ALL.len(), 26);
        assert_eq!(AspectRatio::ALL.len(), 5);
    }

    #[test]
    fn test_parse_is_forgiving() {
        assert_eq!("hyper-realistic".parse::<Style>(), Ok(Style::HyperRealistic));
        assert_eq!("Hyper realistic".parse::<Style>(), Ok(Style::HyperRealistic));
        assert_eq!("HYPER_REALISTIC".parse::<Style>(), Ok(Style::HyperRealistic));
        assert_eq!("trompe-l'œil".parse::<Style>(), Ok(Style::TrompeLoeil));
        assert_eq!("title-card".parse::<IntroType>(), Ok(IntroType::TitleCard));
        assert_eq!("Fade In/Out".parse::<IntroType>(), Ok(IntroType::FadeInOut));
        assert_eq!("2.39:1".parse::<AspectRatio>(), Ok(AspectRatio::Anamorphic));
        assert_eq!("4k".parse::<Resolution>(), Ok(Resolution::Uhd));
        assert_eq!("OceanWaves".parse::<SoundEffect>(), Ok(SoundEffect::OceanWaves));
    }

    #[test]
    fn test_parse_unknown_value() {
        let err = "sparkly".parse::<Mood>().unwrap_err();
        assert_eq!(err.kind, "mood");
        assert_eq!(err.value, "sparkly");
        assert!(err.to_string().contains("cinegen options mood"));
    }

    #[test]
    fn test_labels_round_trip_through_parse() {
        for style in Style::ALL {
            assert_eq!(style.label().parse::<Style>(), Ok(*style));
        }
        for intro in IntroType::ALL {
            assert_eq!(intro.label().parse::<IntroType>(), Ok(*intro));
        }
    }

    #[test]
    fn test_defaults_match_form() {
        assert_eq!(Mood::default(), Mood::Cinematic);
        assert_eq!(Style::default(), Style::HyperRealistic);
        assert_eq!(AspectRatio::default().label(), "16:9");
        assert_eq!(Resolution::default().label(), "HD");
        assert_eq!(IntroType::default(), IntroType::None);
        assert_eq!(TextAnimationStyle::default().label(), "Fade In");
        assert_eq!(TextAnimationSpeed::default(), TextAnimationSpeed::Normal);
        assert_eq!(SoundEffect::default(), SoundEffect::None);
        assert_eq!(ParticleType::default(), ParticleType::None);
        assert_eq!(ImageFilter::default(), ImageFilter::None);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Style::BlackAndWhite).unwrap();
        assert_eq!(json, "\"Black and White\"");
        let mood: Mood = serde_json::from_str("\"melancholic\"").unwrap();
        assert_eq!(mood, Mood::Melancholic);
        assert!(serde_json::from_str::<Mood>("\"grumpy\"").is_err());
    }

    #[test]
    fn test_sound_effect_file_stem() {
        assert_eq!(SoundEffect::OceanWaves.file_stem(), "ocean_waves");
        assert_eq!(SoundEffect::Rain.file_stem(), "rain");
    }

    #[test]
    fn test_labels_for_kind() {
        let ratios = labels_for_kind("aspect-ratio").unwrap();
        assert_eq!(ratios, vec!["16:9", "9:16", "1:1", "4:3", "2.39:1"]);
        assert!(labels_for_kind("colour").is_none());
        for kind in OPTION_KINDS {
            assert!(labels_for_kind(kind).is_some(), "kind {} should resolve", kind);
        }
    }

    #[test]
    fn test_joined_labels() {
        assert_eq!(
            joined_labels(TextAnimationSpeed::ALL),
            "Slow, Normal, Fast"
        );
    }
}
