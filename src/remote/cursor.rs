/// Current position inside a remote collection, kept as a stack of components
///
/// Front-ends use this to move down into a directory and back up again
/// without slicing path strings.
///
/// ```
/// use collection_mirror::remote::RemoteCursor;
///
/// let mut cursor = RemoteCursor::new();
/// cursor.enter("data/2023");
/// assert_eq!(cursor.path(), "/data/2023/");
/// assert!(cursor.up());
/// assert_eq!(cursor.path(), "/data/");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteCursor {
    components: Vec<String>,
}

impl RemoteCursor {
    /// Cursor at the collection root
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor positioned at `path`
    pub fn at(path: &str) -> Self {
        let mut cursor = Self::new();
        cursor.enter(path);
        cursor
    }

    /// Descend into `name`
    ///
    /// `name` may hold several `/`-separated components; `..` moves up one
    /// level and `.` or empty components are ignored.
    pub fn enter(&mut self, name: &str) {
        for component in name.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    self.components.pop();
                }
                other => self.components.push(other.to_string()),
            }
        }
    }

    /// Move to the parent directory; returns false (and stays put) at the root
    pub fn up(&mut self) -> bool {
        self.components.pop().is_some()
    }

    /// Whether the cursor is at the collection root
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Components from the root down
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Listing path for the current position, `/` at the root, `/a/b/` below it
    pub fn path(&self) -> String {
        let mut path = String::from("/");
        for component in &self.components {
            path.push_str(component);
            path.push('/');
        }
        path
    }
}

impl std::fmt::Display for RemoteCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
