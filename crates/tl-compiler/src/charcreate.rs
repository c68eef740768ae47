//! The character-select screen stub.
//!
//! The stock selection screen only knows the three shipped classes. When
//! class merging is enabled, the compiler writes a replacement layout with
//! one button per merged class and one per detected pet, laid out as two
//! button columns with fixed row spacing.

use std::collections::BTreeMap;

use tl_utils::ascii_upper;

/// Classes the stock screen already offers; they get no extra button.
const BUILTIN_CLASSES: [&str; 3] = ["DESTROYER", "VANQUISHER", "ALCHEMIST"];

/// Widget IDs below this are taken by the stock screen's own controls.
const FIRST_CLASS_ID: usize = 3;
/// First extra class row, just below the three stock buttons.
const CLASS_TOP: usize = 233;
/// First pet row in the pet column.
const PET_TOP: usize = 45;
/// Vertical distance between buttons.
const ROW_STEP: usize = 30;

const PREFIX: &str = r#"<?xml version="1.0" ?>
<GUILayout>
<Window Type="GuiLook/StaticImage" Name="CharacterCreate">
<Property Name="UnifiedAreaRect" Value="{{0,0},{0,0},{1,0},{1,0}}" />
<Property Name="MousePassThroughEnabled" Value="True" />
<Window Type="GuiLook/StaticImage" Name="CharacterCreate/ClassPanel">
<Property Name="UnifiedPosition" Value="{{0,30},{0,96}}" />
<Property Name="UnifiedSize" Value="{{0,142},{0,420}}" />
"#;

const SEPARATOR: &str = r#"</Window>
<Window Type="GuiLook/StaticImage" Name="CharacterCreate/PetPanel">
<Property Name="UnifiedPosition" Value="{{0,30},{0,540}}" />
<Property Name="UnifiedSize" Value="{{0,150},{0,180}}" />
"#;

const SUFFIX: &str = r#"</Window>
</Window>
</GUILayout>
"#;

/// Render the layout text for the given class and pet registries
/// (name → display name, both already sorted by name).
pub fn render(classes: &BTreeMap<String, String>, pets: &BTreeMap<String, String>) -> String {
    let mut out = String::from(PREFIX);

    let mut id = FIRST_CLASS_ID;
    let mut top = CLASS_TOP;
    for (name, display) in classes {
        if BUILTIN_CLASSES.contains(&ascii_upper(name).as_str()) {
            continue;
        }
        out.push_str(&format!(
            concat!(
                "<Window Type=\"GuiLook/StandardButton\" Name=\"{name}\">",
                "<Property Name=\"UnifiedPosition\" Value=\"{{{{0,5}},{{0,{top}}}}}\" />",
                "<Property Name=\"UnifiedSize\" Value=\"{{{{0,132}},{{0,28}}}}\" />",
                "<Property Name=\"ID\" Value=\"{id}\" />",
                "<Property Name=\"Text\" Value=\"{display}\" />",
                "<Property Name=\"Tooltip\" Value=\"Select {display}\" />",
                "<Property Name=\"onClick\" Value=\"guiSelect1\"/>",
                "</Window>\n"
            ),
            name = name,
            top = top,
            id = id,
            display = display,
        ));
        id += 1;
        top += ROW_STEP;
    }

    out.push_str(SEPARATOR);

    let mut top = PET_TOP;
    for (name, display) in pets {
        out.push_str(&format!(
            concat!(
                "<Window Type=\"GuiLook/StandardButton\" Name=\"{name}\">",
                "<Property Name=\"UnifiedPosition\" Value=\"{{{{0,0}},{{0,{top}}}}}\" />",
                "<Property Name=\"UnifiedSize\" Value=\"{{{{0,140}},{{0,28}}}}\" />",
                "<Property Name=\"Text\" Value=\"{display}\"/>",
                "<Property Name=\"onClick\" Value=\"guiPet1\"/>",
                "</Window>\n"
            ),
            name = name,
            top = top,
            display = display,
        ));
        top += ROW_STEP;
    }

    out.push_str(SUFFIX);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builtins_get_no_button() {
        let classes = registry(&[("Destroyer", "Destroyer"), ("Summoner", "The Summoner")]);
        let out = render(&classes, &BTreeMap::new());

        assert!(!out.contains("Name=\"Destroyer\""));
        assert!(out.contains("Name=\"Summoner\""));
        assert!(out.contains("Value=\"Select The Summoner\""));
    }

    #[test]
    fn rows_and_ids_advance() {
        let classes = registry(&[("Aaa", "Aaa"), ("Bbb", "Bbb")]);
        let pets = registry(&[("HORSE", "Horse"), ("WOLF", "Wolf")]);
        let out = render(&classes, &pets);

        // Classes: ids from 3, rows from 233 in steps of 30.
        assert!(out.contains("{{0,5},{0,233}}"));
        assert!(out.contains("\"ID\" Value=\"3\""));
        assert!(out.contains("{{0,5},{0,263}}"));
        assert!(out.contains("\"ID\" Value=\"4\""));

        // Pets: rows from 45.
        assert!(out.contains("{{0,0},{0,45}}"));
        assert!(out.contains("{{0,0},{0,75}}"));
        assert!(out.contains("guiPet1"));
    }

    #[test]
    fn empty_registries_still_produce_a_frame() {
        let out = render(&BTreeMap::new(), &BTreeMap::new());
        assert!(out.starts_with("<?xml"));
        assert!(out.ends_with("</GUILayout>\n"));
    }
}
