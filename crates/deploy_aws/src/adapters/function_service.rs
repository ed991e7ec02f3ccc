pub trait FunctionUpdater {
    fn update_function_code(
        &self,
        function_name: &str,
        bucket: &str,
        key: &str,
    ) -> Result<(), String>;
}
