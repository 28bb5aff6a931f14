mod test_config_files;
mod test_conversions;
mod test_properties;
