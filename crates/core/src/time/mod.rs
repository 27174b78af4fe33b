pub mod tehran;
