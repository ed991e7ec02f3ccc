pub trait ArtifactStore {
    fn put_object(&self, key: &str, body: &[u8]) -> Result<(), String>;
}
