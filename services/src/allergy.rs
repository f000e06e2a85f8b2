// services/src/allergy.rs
use models::prescription::AllergyWarning;

/// Screens a medication against a patient's recorded allergies. Pure
/// function, evaluated at prescription-creation time; the caller decides
/// what to do with the warnings (they never block the order).
///
/// Matching is a case-insensitive substring test in both directions, so the
/// allergy "penicillin" flags "Penicillin V" and the allergy
/// "amoxicillin/clavulanate" flags "amoxicillin".
pub fn allergy_warnings(allergies: &[String], medication_names: &[&str]) -> Vec<AllergyWarning> {
    let mut warnings = Vec::new();
    for allergy in allergies {
        let allergy_lc = allergy.trim().to_lowercase();
        if allergy_lc.is_empty() {
            continue;
        }
        for name in medication_names {
            let name_lc = name.trim().to_lowercase();
            if name_lc.is_empty() {
                continue;
            }
            if name_lc.contains(&allergy_lc) || allergy_lc.contains(&name_lc) {
                warnings.push(AllergyWarning {
                    medication: name.trim().to_string(),
                    matched_allergy: allergy.trim().to_string(),
                    message: format!(
                        "patient has a recorded allergy to '{}' which matches medication '{}'",
                        allergy.trim(),
                        name.trim()
                    ),
                });
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_flag_substring_matches_in_either_direction() {
        let allergies = vec!["penicillin".to_string()];
        let warnings = allergy_warnings(&allergies, &["Penicillin V"]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].matched_allergy, "penicillin");

        let allergies = vec!["amoxicillin/clavulanate".to_string()];
        let warnings = allergy_warnings(&allergies, &["Amoxicillin"]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn should_stay_quiet_for_unrelated_medications() {
        let allergies = vec!["penicillin".to_string(), "latex".to_string()];
        assert!(allergy_warnings(&allergies, &["Ibuprofen", "Metformin"]).is_empty());
    }

    #[test]
    fn should_screen_every_supplied_name() {
        let allergies = vec!["sulfa".to_string()];
        let warnings = allergy_warnings(&allergies, &["Bactrim", "Sulfamethoxazole"]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].medication, "Sulfamethoxazole");
    }

    #[test]
    fn should_ignore_blank_entries() {
        let allergies = vec!["  ".to_string()];
        assert!(allergy_warnings(&allergies, &["Anything"]).is_empty());
    }
}
