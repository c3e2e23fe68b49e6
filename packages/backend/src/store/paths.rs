/// Document layout, namespaced by deployment id:
///
/// ```text
/// artifacts/{appId}/users/{uid}/profile/data
/// artifacts/{appId}/users/{uid}/journals/{entryId}
/// artifacts/{appId}/users/{uid}/routines/{routineId}
/// artifacts/{appId}/public/data/students/{uid}
/// artifacts/{appId}/public/data/missions/{missionId}
/// artifacts/{appId}/public/data/reports/{studentId}
/// artifacts/{appId}/accounts/{displayName}
/// ```
#[derive(Debug, Clone)]
pub struct DocPaths {
    root: String,
}

impl DocPaths {
    pub fn new(app_id: &str) -> Self {
        Self {
            root: format!("artifacts/{}", segment(app_id)),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Prefix covering every document a user owns.
    pub fn user_prefix(&self, uid: &str) -> String {
        format!("{}/users/{}/", self.root, segment(uid))
    }

    pub fn public_prefix(&self) -> String {
        format!("{}/public/data/", self.root)
    }

    pub fn private_profile(&self, uid: &str) -> String {
        format!("{}profile/data", self.user_prefix(uid))
    }

    pub fn public_profiles(&self) -> String {
        format!("{}students", self.public_prefix())
    }

    pub fn public_profile(&self, uid: &str) -> String {
        format!("{}/{}", self.public_profiles(), segment(uid))
    }

    pub fn missions(&self) -> String {
        format!("{}missions", self.public_prefix())
    }

    pub fn mission(&self, id: &str) -> String {
        format!("{}/{}", self.missions(), segment(id))
    }

    pub fn journals(&self, uid: &str) -> String {
        format!("{}journals", self.user_prefix(uid))
    }

    pub fn journal(&self, uid: &str, id: &str) -> String {
        format!("{}/{}", self.journals(uid), segment(id))
    }

    pub fn routines(&self, uid: &str) -> String {
        format!("{}routines", self.user_prefix(uid))
    }

    pub fn routine(&self, uid: &str, id: &str) -> String {
        format!("{}/{}", self.routines(uid), segment(id))
    }

    pub fn reports(&self) -> String {
        format!("{}reports", self.public_prefix())
    }

    pub fn report(&self, student_id: &str) -> String {
        format!("{}/{}", self.reports(), segment(student_id))
    }

    pub fn accounts(&self) -> String {
        format!("{}/accounts", self.root)
    }

    pub fn account(&self, display_name: &str) -> String {
        format!("{}/{}", self.accounts(), segment(&account_key(display_name)))
    }
}

/// Display names are matched case-insensitively and ignore surrounding space.
pub fn account_key(display_name: &str) -> String {
    display_name.trim().to_lowercase()
}

fn segment(raw: &str) -> String {
    urlencoding::encode(raw.trim()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_paths_are_namespaced() {
        let paths = DocPaths::new("class-3");
        assert_eq!(paths.private_profile("u1"), "artifacts/class-3/users/u1/profile/data");
        assert_eq!(paths.public_profile("u1"), "artifacts/class-3/public/data/students/u1");
        assert!(paths.private_profile("u1").starts_with(&paths.user_prefix("u1")));
    }

    #[test]
    fn test_segments_cannot_escape_collection() {
        let paths = DocPaths::new("app");
        let path = paths.mission("a/b");
        assert_eq!(path, "artifacts/app/public/data/missions/a%2Fb");
    }

    #[test]
    fn test_account_key_normalizes() {
        let paths = DocPaths::new("app");
        assert_eq!(paths.account(" Kim "), paths.account("kim"));
        assert_eq!(paths.account("김민지"), format!("artifacts/app/accounts/{}", urlencoding::encode("김민지")));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_mission_path_stays_one_segment(id in "\\PC{0,24}") {
                let paths = DocPaths::new("app");
                let prefix = format!("{}/", paths.missions());
                let path = paths.mission(&id);
                prop_assert!(path.starts_with(&prefix));
                prop_assert!(!path[prefix.len()..].contains('/'));
            }

            #[test]
            fn prop_account_key_is_case_insensitive(name in "[a-zA-Z가-힣]{1,12}") {
                let paths = DocPaths::new("app");
                prop_assert_eq!(paths.account(&name.to_uppercase()), paths.account(&name.to_lowercase()));
            }
        }
    }
}
