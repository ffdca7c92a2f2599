//! Per-material shader sources
//!
//! A material is a small WGSL file defining one shading function. The
//! [`MaterialList`] maps material ids onto those files, falling back to a
//! default file for ids it does not know.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialList {
    default_path: PathBuf,
    first_material: u8,
    paths: Vec<PathBuf>,
}

impl MaterialList {
    pub fn new(default_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
            first_material: 0,
            paths: Vec::new(),
        }
    }

    /// List whose `paths[k]` is the file of material `first_material + k`
    pub fn with_paths(
        default_path: impl Into<PathBuf>,
        first_material: u8,
        paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            default_path: default_path.into(),
            first_material,
            paths,
        }
    }

    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    pub fn set_default_path(&mut self, path: impl Into<PathBuf>) {
        self.default_path = path.into();
    }

    pub fn first_material(&self) -> u8 {
        self.first_material
    }

    pub fn nb_materials(&self) -> usize {
        self.paths.len()
    }

    /// File for `material_id`, or the default file when the id is not listed
    pub fn material_path(&self, material_id: u8) -> &Path {
        material_id
            .checked_sub(self.first_material)
            .and_then(|k| self.paths.get(k as usize))
            .map_or(&self.default_path, |p| p)
    }

    /// Sets the file of `material_id`, growing the list in either direction.
    /// Gaps opened by the growth get the default file.
    pub fn set_material_path(&mut self, material_id: u8, path: impl Into<PathBuf>) {
        let path = path.into();

        if self.paths.is_empty() {
            self.first_material = material_id;
            self.paths.push(path);
            return;
        }

        if material_id < self.first_material {
            let gap = (self.first_material - material_id) as usize;
            let mut paths = Vec::with_capacity(gap + self.paths.len());
            paths.push(path);
            paths.extend(std::iter::repeat(self.default_path.clone()).take(gap - 1));
            paths.append(&mut self.paths);
            self.paths = paths;
            self.first_material = material_id;
            return;
        }

        let k = (material_id - self.first_material) as usize;
        if k >= self.paths.len() {
            self.paths.resize(k + 1, self.default_path.clone());
        }
        self.paths[k] = path;
    }

    /// Distinct files, in first-use order, together with the ids using them.
    /// Ids of `ids` that the list does not know map to the default file.
    pub fn group_by_path(&self, ids: impl IntoIterator<Item = u8>) -> Vec<(PathBuf, Vec<u8>)> {
        let mut groups: Vec<(PathBuf, Vec<u8>)> = Vec::new();
        for id in ids {
            let path = self.material_path(id);
            match groups.iter_mut().find(|(p, _)| p.as_path() == path) {
                Some((_, members)) => members.push(id),
                None => groups.push((path.to_path_buf(), vec![id])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_ids_get_default() {
        let list = MaterialList::with_paths(
            "default.wgsl",
            2,
            vec!["a.wgsl".into(), "b.wgsl".into()],
        );

        assert_eq!(list.material_path(1), Path::new("default.wgsl"));
        assert_eq!(list.material_path(2), Path::new("a.wgsl"));
        assert_eq!(list.material_path(3), Path::new("b.wgsl"));
        assert_eq!(list.material_path(4), Path::new("default.wgsl"));
    }

    #[test]
    fn test_set_material_path_grows_both_ways() {
        let mut list = MaterialList::new("default.wgsl");
        list.set_material_path(5, "five.wgsl");
        assert_eq!(list.first_material(), 5);

        list.set_material_path(8, "eight.wgsl");
        assert_eq!(list.nb_materials(), 4);
        assert_eq!(list.material_path(7), Path::new("default.wgsl"));
        assert_eq!(list.material_path(8), Path::new("eight.wgsl"));

        list.set_material_path(2, "two.wgsl");
        assert_eq!(list.first_material(), 2);
        assert_eq!(list.nb_materials(), 7);
        assert_eq!(list.material_path(2), Path::new("two.wgsl"));
        assert_eq!(list.material_path(3), Path::new("default.wgsl"));
        assert_eq!(list.material_path(5), Path::new("five.wgsl"));

        list.set_material_path(5, "five-bis.wgsl");
        assert_eq!(list.material_path(5), Path::new("five-bis.wgsl"));
    }

    #[test]
    fn test_group_by_path() {
        let list = MaterialList::with_paths("d.wgsl", 1, vec!["a.wgsl".into(), "d.wgsl".into()]);
        let groups = list.group_by_path(0..=3);

        assert_eq!(
            groups,
            vec![
                (PathBuf::from("d.wgsl"), vec![0, 2, 3]),
                (PathBuf::from("a.wgsl"), vec![1]),
            ]
        );
    }
}
